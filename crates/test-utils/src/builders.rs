#![allow(dead_code)]

use dagrun::config::{ConfigFile, ConnectionSection, NodeConfig, RawConfigFile, RunSection};
use dagrun::dag::{Node, WorkSpec};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                connection: ConnectionSection::default(),
                run: RunSection::default(),
                node: Vec::new(),
            },
        }
    }

    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.config.node.push(node);
        self
    }

    pub fn with_database(mut self, database: &str) -> Self {
        self.config.connection.database = database.to_string();
        self
    }

    pub fn with_satisfied(mut self, source: &str) -> Self {
        self.config.run.satisfied.push(source.to_string());
        self
    }

    /// Raw config, for tests that exercise validation failures.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(name: &str, sql: &str) -> Self {
        Self {
            node: NodeConfig::inline(name, sql),
        }
    }

    pub fn from_file(name: &str, path: &str) -> Self {
        let mut node = NodeConfig::inline(name, "");
        node.sql = None;
        node.sql_file = Some(path.to_string());
        Self { node }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.node.after.push(dep.to_string());
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        self.node.database = Some(database.to_string());
        self
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.node.schema = Some(schema.to_string());
        self
    }

    pub fn busy_timeout_ms(mut self, ms: u64) -> Self {
        self.node.busy_timeout_ms = Some(ms);
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}

/// Plain node whose SQL is just its own name; handy with `FakeConnection`.
pub fn named_node(name: &str, after: &[&str]) -> Node {
    Node::new(
        name,
        after.iter().map(|s| s.to_string()).collect(),
        WorkSpec::Sql(name.to_string()),
    )
}
