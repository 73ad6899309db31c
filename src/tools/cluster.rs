//! Cluster tools.
//!
//! Tools: cluster_info, cluster_nodes, cluster_keyslot, cluster_count_keysinslot

use std::collections::BTreeMap;

use serde::Serialize;

use crate::client::reply::parse_info;
use crate::client::SharedClient;
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, require_non_empty};

/// Highest hash slot in a cluster.
pub const MAX_SLOT: i64 = 16383;

tool_input! {
    struct EmptyInput {}
}

tool_input! {
    struct KeyslotInput {
        #[field("key", "required,description=Key to get the hash slot for")]
        key: String,
    }
}

tool_input! {
    struct CountInput {
        #[field("slot", "required,description=Hash slot number (0-16383)")]
        slot: i64,
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    info: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct NodesOutput {
    nodes: String,
}

#[derive(Debug, Serialize)]
struct SlotOutput {
    slot: i64,
}

#[derive(Debug, Serialize)]
struct CountOutput {
    count: i64,
}

/// Register the cluster tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "cluster_info",
        "Get Redis/Valkey cluster information and state",
        client,
        cluster_info,
    ));
    registry.must_register(command_tool(
        "cluster_nodes",
        "Get information about all nodes in the Redis/Valkey cluster",
        client,
        cluster_nodes,
    ));
    registry.must_register(command_tool(
        "cluster_keyslot",
        "Get the hash slot for a key in a Redis/Valkey cluster",
        client,
        cluster_keyslot,
    ));
    registry.must_register(command_tool(
        "cluster_count_keysinslot",
        "Count the number of keys in a specific hash slot",
        client,
        cluster_count_keysinslot,
    ));
}

async fn cluster_info(client: SharedClient, _input: EmptyInput) -> Result<InfoOutput> {
    let text = client
        .cluster_info()
        .await
        .map_err(|e| McpError::upstream("failed to get cluster info", e))?;
    Ok(InfoOutput {
        info: parse_info(&text),
    })
}

async fn cluster_nodes(client: SharedClient, _input: EmptyInput) -> Result<NodesOutput> {
    let nodes = client
        .cluster_nodes()
        .await
        .map_err(|e| McpError::upstream("failed to get cluster nodes", e))?;
    Ok(NodesOutput { nodes })
}

async fn cluster_keyslot(client: SharedClient, input: KeyslotInput) -> Result<SlotOutput> {
    require_non_empty(&input.key, "key")?;
    let slot = client
        .cluster_keyslot(&input.key)
        .await
        .map_err(|e| McpError::upstream("failed to get key slot", e))?;
    Ok(SlotOutput { slot })
}

async fn cluster_count_keysinslot(client: SharedClient, input: CountInput) -> Result<CountOutput> {
    if !(0..=MAX_SLOT).contains(&input.slot) {
        return Err(McpError::validation(format!(
            "slot must be between 0 and {}",
            MAX_SLOT
        )));
    }
    let count = client
        .cluster_count_keys_in_slot(input.slot)
        .await
        .map_err(|e| McpError::upstream("failed to count keys in slot", e))?;
    Ok(CountOutput { count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{MockValkeyClient, ValkeyError};
    use std::sync::Arc;

    fn shared(mock: MockValkeyClient) -> SharedClient {
        Arc::new(mock)
    }

    #[tokio::test]
    async fn test_cluster_info_parses_fields() {
        let mut mock = MockValkeyClient::new();
        mock.expect_cluster_info().returning(|| {
            Ok("cluster_state:ok\r\ncluster_slots_assigned:16384\r\ncluster_known_nodes:6\r\n".into())
        });
        let out = cluster_info(shared(mock), EmptyInput {}).await.unwrap();
        assert_eq!(out.info["cluster_state"], "ok");
        assert_eq!(out.info["cluster_known_nodes"], "6");
    }

    #[tokio::test]
    async fn test_cluster_info_disabled() {
        let mut mock = MockValkeyClient::new();
        mock.expect_cluster_info().returning(|| {
            Err(ValkeyError::UnexpectedReply {
                command: "CLUSTER INFO",
                reason: "cluster support disabled".into(),
            })
        });
        let err = cluster_info(shared(mock), EmptyInput {}).await.unwrap_err();
        assert!(err.to_string().starts_with("failed to get cluster info: "));
    }

    #[tokio::test]
    async fn test_count_keys_slot_bounds() {
        let client = shared(MockValkeyClient::new());
        for slot in [-1, MAX_SLOT + 1] {
            let err = cluster_count_keysinslot(client.clone(), CountInput { slot })
                .await
                .unwrap_err();
            assert_eq!(err.to_string(), "slot must be between 0 and 16383");
        }
    }

    #[tokio::test]
    async fn test_count_keys_edge_slots() {
        let mut mock = MockValkeyClient::new();
        mock.expect_cluster_count_keys_in_slot()
            .times(2)
            .returning(|slot| Ok(if slot == 0 { 4 } else { 0 }));
        let client = shared(mock);
        let out = cluster_count_keysinslot(client.clone(), CountInput { slot: 0 })
            .await
            .unwrap();
        assert_eq!(out.count, 4);
        let out = cluster_count_keysinslot(client, CountInput { slot: MAX_SLOT })
            .await
            .unwrap();
        assert_eq!(out.count, 0);
    }

    #[tokio::test]
    async fn test_keyslot() {
        let mut mock = MockValkeyClient::new();
        mock.expect_cluster_keyslot()
            .withf(|key| key == "user:{42}")
            .returning(|_| Ok(8000));
        let out = cluster_keyslot(
            shared(mock),
            KeyslotInput {
                key: "user:{42}".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(out.slot, 8000);
    }
}
