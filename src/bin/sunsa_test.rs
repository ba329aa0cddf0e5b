// Copyright (c) 2024 The sunsa-intg authors
// SPDX-License-Identifier: MPL-2.0

//! Sunsa cloud API credential test tool

use clap::Parser;
use std::process::exit;
use std::time::Duration;
use sunsa_intg::api::{SunsaClient, validate_credentials};
use sunsa_intg::configuration::{ENV_DISABLE_CERT_VERIFICATION, get_configuration};
use sunsa_intg::entity::{closing_direction, device_name, percent_open};
use sunsa_intg::util::bool_from_env;
use url::Url;

#[derive(Parser, Debug)]
#[command(version, about = "Sunsa cloud API credential test", long_about = None)]
pub struct Opt {
    /// Configuration file.
    #[arg(short, long)]
    pub config: Option<String>,
    /// Sunsa public API base URL (overrides configuration file).
    #[arg(short, long)]
    pub url: Option<String>,
    /// Sunsa user id (overrides configuration file).
    #[arg(short = 'i', long)]
    pub user_id: Option<u32>,
    /// Sunsa API key (overrides configuration file).
    #[arg(short = 'k', long)]
    pub api_key: Option<String>,
    /// Request timeout in seconds (overrides configuration file).
    #[arg(short, long)]
    pub timeout: Option<u64>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();

    let opt = Opt::parse();
    let mut cfg = get_configuration(opt.config.as_deref())?.sunsa;
    if let Some(url) = opt.url {
        cfg.url = Url::parse(&url)?;
    }
    if let Some(user_id) = opt.user_id {
        cfg.user_id = user_id;
    }
    if let Some(api_key) = opt.api_key {
        cfg.set_api_key(api_key);
    }
    if let Some(timeout) = opt.timeout {
        cfg.request_timeout = Duration::from_secs(timeout);
    }

    if !cfg.has_credentials() {
        eprintln!("Can't connect to the Sunsa API: user id or API key is missing");
        exit(1);
    }

    println!(
        "Validating credentials of user {} at {} (timeout={}s)",
        cfg.user_id,
        cfg.url,
        cfg.request_timeout.as_secs()
    );

    let client = SunsaClient::from_settings(&cfg, bool_from_env(ENV_DISABLE_CERT_VERIFICATION));
    match validate_credentials(&client).await {
        Ok(devices) => {
            println!("Credentials are valid, found {} devices:", devices.len());
            for device in devices {
                let position = device
                    .position
                    .map(|p| format!("{p} ({}% open)", percent_open(p)))
                    .unwrap_or_else(|| "unknown".into());
                println!(
                    "  {:>8}  {:<24} connected={:<5} closing direction={:+} position={position}",
                    device.id_device,
                    device_name(&device),
                    device.is_connected,
                    closing_direction(&device),
                );
            }
            Ok(())
        }
        Err((category, e)) => {
            eprintln!("Credential validation failed: {category} ({e})");
            exit(1);
        }
    }
}
