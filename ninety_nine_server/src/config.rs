use ninety_nine_core::GameConfig;
use std::env;
use std::fs;
use std::net::SocketAddr;
use thiserror::Error;

pub const DEFAULT_ADDR: &str = "0.0.0.0:25917";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// 新房间使用的规则
    pub rules: GameConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取规则文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("解析规则文件失败: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("无效的监听地址: {0}")]
    InvalidAddr(String),
    #[error("无效的规则: {0}")]
    Invalid(String),
}

impl ServerConfig {
    /// 从环境变量读取配置
    ///
    /// - `NINETY_NINE_ADDR` 监听地址，默认 `0.0.0.0:25917`
    /// - `NINETY_NINE_RULES` 规则文件 (TOML) 路径，未设置时使用默认规则
    pub fn load() -> Result<Self, ConfigError> {
        let addr_str = env::var("NINETY_NINE_ADDR").unwrap_or_else(|_| DEFAULT_ADDR.to_string());
        let addr = addr_str.parse().map_err(|_| ConfigError::InvalidAddr(addr_str.clone()))?;

        let rules = match env::var("NINETY_NINE_RULES") {
            Ok(path) if !path.is_empty() => parse_rules(&fs::read_to_string(path)?)?,
            _ => GameConfig::default(),
        };

        Ok(Self { addr, rules })
    }
}

pub fn parse_rules(s: &str) -> Result<GameConfig, ConfigError> {
    let rules: GameConfig = toml::from_str(s)?;
    if rules.max_bid_cards == 0 {
        return Err(ConfigError::Invalid("max_bid_cards 必须大于 0".into()));
    }
    if rules.min_players == 0 {
        return Err(ConfigError::Invalid("min_players 必须大于 0".into()));
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rules_use_defaults() {
        assert_eq!(parse_rules("").unwrap(), GameConfig::default());
    }

    #[test]
    fn test_partial_rules_override() {
        let rules = parse_rules(
            r#"
            exact_bid_bonus = 10

            [declaration_bonus]
            flush = 30
            "#,
        )
        .unwrap();
        assert_eq!(rules.exact_bid_bonus, 10);
        assert_eq!(rules.declaration_bonus.flush, 30);
        assert_eq!(rules.declaration_bonus.marriage, 0);
        assert_eq!(rules.max_bid_cards, 3);
    }

    #[test]
    fn test_zero_max_bid_cards_rejected() {
        assert!(matches!(parse_rules("max_bid_cards = 0"), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_rules_rejected() {
        assert!(matches!(parse_rules("trick_points = \"many\""), Err(ConfigError::Parse(_))));
    }
}
