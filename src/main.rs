// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

#![forbid(non_ascii_idents)]
#![deny(unsafe_code)]

use actix::Actor;
use actix_web::{App, HttpServer, middleware, web};
use clap::{Command, arg};
use log::{error, info};
use std::io;
use std::net::TcpListener;
use std::path::Path;
use sunsa_intg::api::SunsaClient;
use sunsa_intg::configuration::{
    DEF_CONFIG_FILE, ENV_DISABLE_CERT_VERIFICATION, get_configuration,
};
use sunsa_intg::coordinator::Coordinator;
use sunsa_intg::server::json_error_handler;
use sunsa_intg::util::bool_from_env;
use sunsa_intg::{APP_VERSION, Controller, built_info, server};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let args = Command::new(built_info::PKG_NAME)
        .version(APP_VERSION)
        .about("Sunsa smart blinds integration")
        .arg(arg!(-c --config <FILE> "Configuration file").required(false))
        .get_matches();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg_file = match args.get_one::<String>("config") {
        None => {
            if Path::new(DEF_CONFIG_FILE).exists() {
                info!("Loading default configuration file: {DEF_CONFIG_FILE}");
                Some(DEF_CONFIG_FILE)
            } else {
                None
            }
        }
        Some(c) => Some(c.as_str()),
    };
    let cfg = get_configuration(cfg_file).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to read configuration: {e}"),
        )
    })?;

    if !cfg.sunsa.has_credentials() {
        error!("Sunsa user id or API key is missing in the configuration");
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "Missing Sunsa credentials",
        ));
    }
    if !cfg.integration.http.enabled {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "The http listener must be enabled",
        ));
    }

    info!("{} {APP_VERSION} starting: {:?}", built_info::PKG_NAME, cfg.sunsa);

    let address = format!(
        "{}:{}",
        cfg.integration.interface, cfg.integration.http.port
    );
    let listener = TcpListener::bind(&address)?;
    println!("{} listening on: {address}", built_info::PKG_NAME);

    let client = SunsaClient::from_settings(
        &cfg.sunsa,
        bool_from_env(ENV_DISABLE_CERT_VERIFICATION),
    );
    // polls immediately after start
    let coordinator = Coordinator::new(client, cfg.sunsa.update_interval).start();
    let controller = web::Data::new(Controller::new(cfg.sunsa.clone(), coordinator).start());
    let integration_settings = web::Data::new(cfg.integration.clone());

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(
                web::JsonConfig::default()
                    .limit(16 * 1024) // limit size of the payload (global configuration)
                    .error_handler(json_error_handler),
            )
            .app_data(integration_settings.clone())
            .app_data(controller.clone())
            .configure(server::configure)
    })
    .workers(1)
    .listen(listener)?
    .run()
    .await
}
