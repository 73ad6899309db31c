//! Set tools.
//!
//! Tools: get_set_members, add_set, remove_set_member, get_set_cardinality,
//!        set_is_member, pop_set_member, get_random_set_member, sinter_sets,
//!        sunion_sets, sdiff_sets

use serde::Serialize;

use crate::client::SharedClient;
use crate::encoding::{safe_slice, SafeValue};
use crate::error::{McpError, Result};
use crate::registry::ToolRegistry;
use crate::tool_input;
use crate::tools::{command_tool, or_one, require_items, require_non_empty};

tool_input! {
    struct SetKeyInput {
        #[field("key", "required,description=Set key")]
        key: String,
    }
}

tool_input! {
    struct AddInput {
        #[field("key", "required,description=Set key")]
        key: String,
        #[field("members", "required,minItems=1,description=Members to add to the set")]
        members: Vec<String>,
    }
}

tool_input! {
    struct RemoveInput {
        #[field("key", "required,description=Set key")]
        key: String,
        #[field("members", "required,minItems=1,description=Members to remove from the set")]
        members: Vec<String>,
    }
}

tool_input! {
    struct IsMemberInput {
        #[field("key", "required,description=Set key")]
        key: String,
        #[field("member", "required,description=Member to check")]
        member: String,
    }
}

tool_input! {
    struct PopInput {
        #[field("key", "required")]
        key: String,
        #[field("count", "description=Number of members to pop (default: 1)")]
        count: i64,
    }
}

tool_input! {
    struct RandomInput {
        #[field("key", "required,description=Set key")]
        key: String,
        #[field("count", "description=Number of members to return (default: 1; negative allows repeats)")]
        count: i64,
    }
}

tool_input! {
    struct InterInput {
        #[field("keys", "required,description=Set keys to intersect")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct UnionInput {
        #[field("keys", "required,description=Set keys to union")]
        keys: Vec<String>,
    }
}

tool_input! {
    struct DiffInput {
        #[field("keys", "required,minItems=2,description=Array of set keys - first key is subtracted from, remaining keys are subtracted")]
        keys: Vec<String>,
    }
}

#[derive(Debug, Serialize)]
struct MembersOutput {
    key: String,
    members: Vec<SafeValue>,
    member_count: usize,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct AddOutput {
    key: String,
    members_added: i64,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RemoveOutput {
    key: String,
    members_removed: i64,
    members: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CardinalityOutput {
    key: String,
    cardinality: i64,
    exists: bool,
}

#[derive(Debug, Serialize)]
struct IsMemberOutput {
    key: String,
    member: String,
    is_member: bool,
}

#[derive(Debug, Serialize)]
struct SampleOutput {
    key: String,
    members: Vec<SafeValue>,
    count: usize,
}

#[derive(Debug, Serialize)]
struct AlgebraOutput {
    members: Vec<SafeValue>,
    count: usize,
}

impl AlgebraOutput {
    fn new(raw: Vec<Vec<u8>>) -> Self {
        Self {
            count: raw.len(),
            members: safe_slice(raw),
        }
    }
}

/// Register the set tools.
pub fn register(registry: &mut ToolRegistry, client: &SharedClient) {
    registry.must_register(command_tool(
        "get_set_members",
        "Get all members of a set",
        client,
        get_set_members,
    ));
    registry.must_register(command_tool(
        "add_set",
        "Add members to a set",
        client,
        add_set,
    ));
    registry.must_register(command_tool(
        "remove_set_member",
        "Remove members from a set",
        client,
        remove_set_member,
    ));
    registry.must_register(command_tool(
        "get_set_cardinality",
        "Get the number of members in a set (cardinality)",
        client,
        get_set_cardinality,
    ));
    registry.must_register(command_tool(
        "set_is_member",
        "Check if a member exists in a set",
        client,
        set_is_member,
    ));
    registry.must_register(command_tool(
        "pop_set_member",
        "Remove and return random members from a set",
        client,
        pop_set_member,
    ));
    registry.must_register(command_tool(
        "get_random_set_member",
        "Get random members from a set without removing them",
        client,
        get_random_set_member,
    ));
    registry.must_register(command_tool(
        "sinter_sets",
        "Get the intersection of multiple sets",
        client,
        sinter_sets,
    ));
    registry.must_register(command_tool(
        "sunion_sets",
        "Get the union of multiple sets",
        client,
        sunion_sets,
    ));
    registry.must_register(command_tool(
        "sdiff_sets",
        "Get the difference of sets (members in first set but not in others)",
        client,
        sdiff_sets,
    ));
}

async fn get_set_members(client: SharedClient, input: SetKeyInput) -> Result<MembersOutput> {
    require_non_empty(&input.key, "key")?;
    let members = client.smembers(&input.key).await.map_err(|e| {
        McpError::upstream(
            format!("failed to get set members for key {:?}", input.key),
            e,
        )
    })?;
    Ok(MembersOutput {
        key: input.key,
        member_count: members.len(),
        exists: !members.is_empty(),
        members: safe_slice(members),
    })
}

async fn add_set(client: SharedClient, input: AddInput) -> Result<AddOutput> {
    require_non_empty(&input.key, "key")?;
    require_items(&input.members, "at least one member must be provided")?;
    let members_added = client.sadd(&input.key, &input.members).await.map_err(|e| {
        McpError::upstream(format!("failed to add members to set {:?}", input.key), e)
    })?;
    Ok(AddOutput {
        key: input.key,
        members_added,
        members: input.members,
    })
}

async fn remove_set_member(client: SharedClient, input: RemoveInput) -> Result<RemoveOutput> {
    require_non_empty(&input.key, "key")?;
    require_items(&input.members, "at least one member must be provided")?;
    let members_removed = client.srem(&input.key, &input.members).await.map_err(|e| {
        McpError::upstream(
            format!("failed to remove members from set {:?}", input.key),
            e,
        )
    })?;
    Ok(RemoveOutput {
        key: input.key,
        members_removed,
        members: input.members,
    })
}

async fn get_set_cardinality(
    client: SharedClient,
    input: SetKeyInput,
) -> Result<CardinalityOutput> {
    require_non_empty(&input.key, "key")?;
    let cardinality = client.scard(&input.key).await.map_err(|e| {
        McpError::upstream(
            format!("failed to get set cardinality for key {:?}", input.key),
            e,
        )
    })?;
    Ok(CardinalityOutput {
        key: input.key,
        cardinality,
        exists: cardinality > 0,
    })
}

async fn set_is_member(client: SharedClient, input: IsMemberInput) -> Result<IsMemberOutput> {
    require_non_empty(&input.key, "key")?;
    require_non_empty(&input.member, "member")?;
    let is_member = client
        .sismember(&input.key, &input.member)
        .await
        .map_err(|e| {
            McpError::upstream(
                format!("failed to check set membership for key {:?}", input.key),
                e,
            )
        })?;
    Ok(IsMemberOutput {
        key: input.key,
        member: input.member,
        is_member,
    })
}

async fn pop_set_member(client: SharedClient, input: PopInput) -> Result<SampleOutput> {
    require_non_empty(&input.key, "key")?;
    let raw = client
        .spop(&input.key, or_one(input.count))
        .await
        .map_err(|e| McpError::upstream("failed to pop from set", e))?;
    Ok(SampleOutput {
        key: input.key,
        count: raw.len(),
        members: safe_slice(raw),
    })
}

async fn get_random_set_member(client: SharedClient, input: RandomInput) -> Result<SampleOutput> {
    require_non_empty(&input.key, "key")?;
    let raw = client
        .srandmember(&input.key, or_one(input.count))
        .await
        .map_err(|e| McpError::upstream("failed to get random set member", e))?;
    Ok(SampleOutput {
        key: input.key,
        count: raw.len(),
        members: safe_slice(raw),
    })
}

async fn sinter_sets(client: SharedClient, input: InterInput) -> Result<AlgebraOutput> {
    require_items(&input.keys, "keys cannot be empty")?;
    let raw = client
        .sinter(&input.keys)
        .await
        .map_err(|e| McpError::upstream("set intersection operation failed", e))?;
    Ok(AlgebraOutput::new(raw))
}

async fn sunion_sets(client: SharedClient, input: UnionInput) -> Result<AlgebraOutput> {
    require_items(&input.keys, "keys cannot be empty")?;
    let raw = client
        .sunion(&input.keys)
        .await
        .map_err(|e| McpError::upstream("set union operation failed", e))?;
    Ok(AlgebraOutput::new(raw))
}

async fn sdiff_sets(client: SharedClient, input: DiffInput) -> Result<AlgebraOutput> {
    if input.keys.len() < 2 {
        return Err(McpError::validation(
            "at least 2 keys required for set difference",
        ));
    }
    let raw = client
        .sdiff(&input.keys)
        .await
        .map_err(|e| McpError::upstream("set difference operation failed", e))?;
    Ok(AlgebraOutput::new(raw))
}
