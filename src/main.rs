//! secure-store CLI 진입점

use clap::Parser;

use secure_store::commands::{build_config, execute, Cli};
use secure_store::error::CommandError;
use secure_store::secrets::SecureStore;

#[tokio::main]
async fn main() {
    secure_store::config::load_env_files();
    secure_store::logging::init_logging();

    let cli = Cli::parse();

    let result = match build_config(&cli) {
        Ok(config) => {
            let store = SecureStore::with_keyring(config);
            execute(&store, cli.command).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            report(&e);
            std::process::exit(1);
        }
    }
}

fn report(error: &CommandError) {
    match serde_json::to_string(error) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}: {}", error.code, error.message),
    }
}
