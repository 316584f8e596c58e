/// Declares a parameter struct that parses from and prints as a
/// `key=value,key=value` string, e.g. `videos=100,caches=10`.
macro_rules! impl_kv_string_serde {
    ($name:ident { $( $field:ident : $ty:ty ),* $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
        #[serde(deny_unknown_fields)]
        pub struct $name {
            $( pub $field : $ty ),*
        }

        impl std::str::FromStr for $name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> anyhow::Result<Self> {
                let mut map = serde_json::Map::new();
                for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                    let (key, value) = pair
                        .split_once('=')
                        .ok_or_else(|| anyhow::anyhow!("Expected key=value, got '{}'", pair))?;
                    let value = value.trim();
                    let value = serde_json::from_str::<serde_json::Value>(value)
                        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
                    map.insert(key.trim().to_string(), value);
                }
                serde_json::from_value(serde_json::Value::Object(map))
                    .map_err(|e| anyhow::anyhow!("Invalid {}: {}", stringify!($name), e))
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let pairs: Vec<String> = vec![
                    $( format!("{}={}", stringify!($field), self.$field) ),*
                ];
                write!(f, "{}", pairs.join(","))
            }
        }
    };
}

/// Writes through a buffer first so a failure never leaves a truncated file.
pub(crate) fn write_file<F>(path: &std::path::Path, write: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> anyhow::Result<()>,
{
    use anyhow::Context;

    let mut buffer = Vec::new();
    write(&mut buffer)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    std::fs::write(path, buffer).with_context(|| format!("Failed to write {:?}", path))
}

#[cfg(feature = "c001")]
pub mod cache_allocation;
#[cfg(feature = "c001")]
pub use cache_allocation as c001;
#[cfg(feature = "c002")]
pub mod ride_dispatch;
#[cfg(feature = "c002")]
pub use ride_dispatch as c002;
