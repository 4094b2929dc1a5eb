use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Error, Result};
use crate::pool::{AddressPool, DEFAULT_MAX_POOL_SIZE, PoolOptions};
use crate::range::AddressRange;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub pool_start: Ipv4Addr,
    pub pool_end: Ipv4Addr,
    /// Overrides `pool_start`/`pool_end` when set, e.g. `"10.8.0.0/24"`.
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u64,
    #[serde(default)]
    pub loop_on_exhaustion: bool,
    #[serde(default)]
    pub skip_reserved: bool,
}

fn default_max_pool_size() -> u64 {
    DEFAULT_MAX_POOL_SIZE
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pool_start: Ipv4Addr::new(10, 8, 0, 2),
            pool_end: Ipv4Addr::new(10, 8, 0, 254),
            cidr: None,
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            loop_on_exhaustion: false,
            skip_reserved: false,
        }
    }
}

impl Config {
    pub async fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if tokio::fs::try_exists(path).await? {
            let content = tokio::fs::read_to_string(path).await?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save(path).await?;
            Ok(config)
        }
    }

    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_pool_size == 0 {
            return Err(Error::InvalidConfig(
                "max_pool_size must be greater than 0".to_string(),
            ));
        }

        let range = self.range().map_err(|error| match error {
            Error::InvalidRange(_) if self.cidr.is_none() => Error::InvalidConfig(
                "pool_start must be less than or equal to pool_end".to_string(),
            ),
            other => Error::InvalidConfig(other.to_string()),
        })?;

        if range.size() > self.max_pool_size {
            return Err(Error::InvalidConfig(format!(
                "pool {} holds {} addresses, more than max_pool_size {}",
                range,
                range.size(),
                self.max_pool_size
            )));
        }

        Ok(())
    }

    /// The range the pool leases from.
    pub fn range(&self) -> Result<AddressRange> {
        match &self.cidr {
            Some(cidr) => AddressRange::from_cidr(cidr),
            None => AddressRange::from_addrs(self.pool_start, self.pool_end),
        }
    }

    pub fn pool_options(&self) -> PoolOptions {
        PoolOptions {
            max_size: self.max_pool_size,
            looping: self.loop_on_exhaustion,
            skip_reserved: self.skip_reserved,
        }
    }

    pub fn build_pool(&self) -> Result<AddressPool> {
        AddressPool::with_options(self.range()?, self.pool_options())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestGuard(String);
    impl Drop for TestGuard {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.range().unwrap().size(), 253);
    }

    #[test]
    fn test_pool_start_greater_than_end() {
        let config = Config {
            pool_start: Ipv4Addr::new(10, 8, 0, 200),
            pool_end: Ipv4Addr::new(10, 8, 0, 100),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_cidr_overrides_bounds() {
        let config = Config {
            cidr: Some("172.16.4.9/22".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        let range = config.range().unwrap();
        assert_eq!(range.first(), Ipv4Addr::new(172, 16, 4, 0));
        assert_eq!(range.last(), Ipv4Addr::new(172, 16, 7, 255));
    }

    #[test]
    fn test_invalid_cidr() {
        let config = Config {
            cidr: Some("172.16.4.9/40".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_pool_larger_than_max() {
        let config = Config {
            cidr: Some("10.0.0.0/8".to_string()),
            max_pool_size: 1 << 16,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            max_pool_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_build_pool_uses_options() {
        let config = Config {
            pool_start: Ipv4Addr::new(10, 8, 0, 254),
            pool_end: Ipv4Addr::new(10, 8, 1, 1),
            loop_on_exhaustion: true,
            skip_reserved: true,
            ..Default::default()
        };
        let pool = config.build_pool().unwrap();
        assert!(pool.is_looping());
        assert_eq!(pool.acquire_addr().unwrap(), Ipv4Addr::new(10, 8, 0, 254));
        assert_eq!(pool.acquire_addr().unwrap(), Ipv4Addr::new(10, 8, 1, 1));
        assert_eq!(pool.acquire_addr().unwrap(), Ipv4Addr::new(10, 8, 0, 254));
    }

    #[test]
    fn test_missing_optional_fields() {
        let json = r#"{ "pool_start": "10.0.0.1", "pool_end": "10.0.0.9" }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_pool_size, DEFAULT_MAX_POOL_SIZE);
        assert!(!config.loop_on_exhaustion);
        assert!(!config.skip_reserved);
        assert!(config.cidr.is_none());
    }

    #[tokio::test]
    async fn test_load_or_create_round_trip() {
        let path = "test_config_round_trip.json".to_string();
        let _guard = TestGuard(path.clone());

        let created = Config::load_or_create(&path).await.unwrap();
        assert_eq!(created.pool_start, Config::default().pool_start);

        let changed = Config {
            cidr: Some("192.168.50.0/24".to_string()),
            loop_on_exhaustion: true,
            ..created
        };
        changed.save(&path).await.unwrap();

        let loaded = Config::load_or_create(&path).await.unwrap();
        assert_eq!(loaded.cidr.as_deref(), Some("192.168.50.0/24"));
        assert!(loaded.loop_on_exhaustion);
    }

    #[tokio::test]
    async fn test_load_rejects_invalid_file() {
        let path = "test_config_invalid.json".to_string();
        let _guard = TestGuard(path.clone());

        let invalid = Config {
            pool_start: Ipv4Addr::new(10, 0, 0, 9),
            pool_end: Ipv4Addr::new(10, 0, 0, 1),
            ..Default::default()
        };
        invalid.save(&path).await.unwrap();

        assert!(Config::load_or_create(&path).await.is_err());
    }
}
