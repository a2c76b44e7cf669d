use serde::{
    Deserialize, Deserializer, Serialize,
    de::{MapAccess, Visitor},
};
use anyhow::{Context, bail};
use serde_json::Value;
use std::{collections::HashMap, fmt, fs, path::Path};

/// Contents of `server_config.json`.
///
/// Servers are kept in file order; connection and registration follow it.
/// Entries stay raw JSON until they are connected, so one malformed entry
/// only fails its own server.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct McpConfig {
    #[serde(rename = "mcpServers", default, deserialize_with = "ordered_servers")]
    pub mcp_servers: Vec<(String, Value)>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum McpServerEntry {
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: Option<HashMap<String, String>>,
    },
    RemoteHttp {
        url: String,
        #[serde(default)]
        env: Option<HashMap<String, String>>,
    },
}

impl McpServerEntry {
    /// Parse one raw `mcpServers` value.
    pub fn from_value(raw: &Value) -> anyhow::Result<Self> {
        if !raw.get("command").is_some_and(Value::is_string)
            && !raw.get("url").is_some_and(Value::is_string)
        {
            bail!("server entry needs a string \"command\" or \"url\"");
        }
        serde_json::from_value(raw.clone()).context("invalid server entry")
    }
}

fn ordered_servers<'de, D>(deserializer: D) -> Result<Vec<(String, Value)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedServers;

    impl<'de> Visitor<'de> for OrderedServers {
        type Value = Vec<(String, serde_json::Value)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of server name to server entry")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((name, entry)) = map.next_entry::<String, serde_json::Value>()? {
                // a repeated key replaces the earlier entry in place
                if let Some(slot) = out.iter_mut().find(|(n, _)| *n == name) {
                    slot.1 = entry;
                } else {
                    out.push((name, entry));
                }
            }
            Ok(out)
        }
    }

    deserializer.deserialize_map(OrderedServers)
}

pub fn load_mcp_config(path: impl AsRef<Path>) -> anyhow::Result<McpConfig> {
    let path = path.as_ref();
    let txt = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&txt).with_context(|| format!("failed to parse {}", path.display()))
}

/// Expand `${VAR}` placeholders from the process environment.
///
/// Unknown variables are left as written.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        match std::env::var(var) {
            Ok(value) => out.push_str(&value),
            Err(_) => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

pub fn expand_env_map(map: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    map.into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), expand_env_placeholders(v)))
        .collect()
}
