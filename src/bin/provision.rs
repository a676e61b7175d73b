use showroom_auth::service::provisioning::ProvisionOutcome;
use showroom_auth::{Config, init_tracing, provision_admin_from_config};

fn print_usage(bin_name: &str) {
    eprintln!("Usage: {bin_name} admin");
    eprintln!("Reads SHOWROOM_PROVISIONING__ADMIN_{{NAME,EMAIL,PHONE,PASSWORD}} or the [provisioning] table of Showroom.toml.");
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args();
    let bin_name = args.next().unwrap_or_else(|| "provision".to_string());
    let command = args.next();

    if command.as_deref() != Some("admin") || args.next().is_some() {
        print_usage(&bin_name);
        std::process::exit(2);
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = config.validate() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    init_tracing(&config.logging.level, config.logging.json_format);

    match provision_admin_from_config(&config).await {
        Ok(ProvisionOutcome::Created(id)) => println!("Admin account created: id={id}"),
        Ok(ProvisionOutcome::AlreadyProvisioned) => println!("An admin account already exists; nothing to do"),
        Err(err) => {
            eprintln!("Provisioning failed: {err}");
            std::process::exit(1);
        }
    }
}
