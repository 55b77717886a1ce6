//! Secure Store Commands
//!
//! 파싱된 CLI 명령을 `SecureStore` 연산으로 실행하고 출력할 문자열을 돌려줍니다.
//! 값을 출력하는 명령은 `get` 하나뿐입니다.

use crate::commands::{Cli, Commands};
use crate::config::SecureStoreConfig;
use crate::error::{CommandError, CommandResult};
use crate::models::FallbackPolicy;
use crate::secrets::SecureStore;

/// 환경 변수 위에 CLI 플래그를 덮어써 설정 생성
pub fn build_config(cli: &Cli) -> CommandResult<SecureStoreConfig> {
    let mut config = SecureStoreConfig::from_env().map_err(|message| CommandError {
        code: "INVALID_CONFIG".to_string(),
        message,
        details: None,
    })?;

    if let Some(service) = &cli.service {
        validate_arg("service", service)?;
        config = config.with_service(service.trim());
    }
    if let Some(dir) = &cli.dir {
        config = config.with_fallback_dir(dir);
    }
    if cli.deny_fallback {
        config = config.with_policy(FallbackPolicy::Deny);
    }
    Ok(config)
}

fn validate_arg(label: &str, value: &str) -> CommandResult<()> {
    if value.trim().is_empty() {
        return Err(CommandError {
            code: "INVALID_ARGUMENT".to_string(),
            message: format!("{} must not be empty.", label),
            details: None,
        });
    }
    Ok(())
}

pub async fn execute(store: &SecureStore, command: Commands) -> CommandResult<String> {
    match command {
        Commands::Set { name, value } => {
            validate_arg("name", &name)?;
            store.set(&name, &value).await?;
            Ok(format!("stored '{}'", name))
        }
        Commands::Get { name } => {
            validate_arg("name", &name)?;
            Ok(store.require(&name).await?)
        }
        Commands::Delete { name } => {
            validate_arg("name", &name)?;
            if store.delete(&name).await? {
                Ok(format!("deleted '{}'", name))
            } else {
                Ok(format!("'{}' was not stored", name))
            }
        }
        Commands::List => Ok(store.list().await?.join("\n")),
        Commands::Has { name } => {
            validate_arg("name", &name)?;
            Ok(store.has(&name).await?.to_string())
        }
        Commands::Status => {
            let status = store.status().await;
            serde_json::to_string_pretty(&status).map_err(|e| CommandError {
                code: "SERIALIZATION_ERROR".to_string(),
                message: format!("Failed to serialize status: {}", e),
                details: None,
            })
        }
    }
}
