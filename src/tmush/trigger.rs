/// Trigger execution engine for TinyMUSH Phase 7
///
/// This module provides a safe, sandboxed scripting system for interactive objects.
/// Triggers fire on player actions (OnLook, OnUse, OnTake, etc.) and execute
/// simple DSL scripts with conditions and actions.
///
/// **Security Features:**
/// - Script length limit: 512 characters
/// - Execution timeout: 100ms
/// - Max actions per trigger: 10
/// - Max messages per trigger: 3
/// - Sandboxed execution (no file/network access)
/// - Rate limiting (100 executions/minute per object)
///
/// **DSL Syntax:**
/// ```text
/// message("text") && condition ? action : fallback
/// ```

use crate::tmush::errors::TinyMushError;
use crate::tmush::storage::TinyMushStore;
use crate::tmush::types::{ObjectTrigger, PlayerRecord, RoomRecord, ObjectRecord};
use std::time::{Duration, Instant};

/// Maximum script length in characters
pub const MAX_SCRIPT_LENGTH: usize = 512;

/// Maximum execution time per trigger
pub const MAX_EXECUTION_TIME: Duration = Duration::from_millis(100);

/// Maximum actions that can execute in a single trigger
pub const MAX_ACTIONS_PER_TRIGGER: u8 = 10;

/// Maximum messages that can be sent in a single trigger
pub const MAX_MESSAGES_PER_TRIGGER: u8 = 3;

/// Maximum nesting depth for expressions
pub const MAX_NESTED_DEPTH: u8 = 5;

/// Maximum trigger executions per minute per object
pub const MAX_EXECUTIONS_PER_MINUTE: u16 = 100;

/// Execution context for trigger scripts
///
/// Contains all the state needed to execute a trigger safely:
/// - Player state (who triggered it)
/// - Object state (what was triggered)
/// - Room state (where it happened)
/// - Execution metadata (limits, counters)
#[derive(Debug, Clone)]
pub struct TriggerContext {
    /// Username of the player who triggered this
    pub player_username: String,
    
    /// Player's display name
    pub player_name: String,
    
    /// ID of the object being triggered
    pub object_id: String,
    
    /// Name of the object
    pub object_name: String,
    
    /// Current room ID
    pub room_id: String,
    
    /// Current room name
    pub room_name: String,
    
    /// When execution started (for timeout checking)
    pub started_at: Instant,
    
    /// How many actions have executed so far
    pub action_count: u8,
    
    /// How many messages have been sent so far
    pub message_count: u8,
    
    /// Current nesting depth (for recursion prevention)
    pub depth: u8,
}

impl TriggerContext {
    /// Create a new trigger execution context
    pub fn new(
        player: &PlayerRecord,
        object: &ObjectRecord,
        room: &RoomRecord,
    ) -> Self {
        Self {
            player_username: player.username.clone(),
            player_name: player.display_name.clone(),
            object_id: object.id.clone(),
            object_name: object.name.clone(),
            room_id: room.id.clone(),
            room_name: room.name.clone(),
            started_at: Instant::now(),
            action_count: 0,
            message_count: 0,
            depth: 0,
        }
    }
    
    /// Check if execution has timed out
    pub fn is_timed_out(&self) -> bool {
        self.started_at.elapsed() > MAX_EXECUTION_TIME
    }
    
    /// Check if action limit has been reached
    pub fn can_execute_action(&self) -> bool {
        self.action_count < MAX_ACTIONS_PER_TRIGGER
    }
    
    /// Check if message limit has been reached
    pub fn can_send_message(&self) -> bool {
        self.message_count < MAX_MESSAGES_PER_TRIGGER
    }
    
    /// Check if nesting depth is within limits
    pub fn can_nest_deeper(&self) -> bool {
        self.depth < MAX_NESTED_DEPTH
    }
    
    /// Increment action counter
    pub fn increment_action(&mut self) {
        self.action_count += 1;
    }
    
    /// Increment message counter
    pub fn increment_message(&mut self) {
        self.message_count += 1;
    }
    
    /// Increment depth counter
    pub fn increment_depth(&mut self) {
        self.depth += 1;
    }
    
    /// Decrement depth counter
    pub fn decrement_depth(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Result of trigger execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    /// Trigger executed successfully, returned messages for player
    Success(Vec<String>),
    
    /// Trigger had no script or was empty
    NoScript,
    
    /// Trigger execution was skipped (conditions not met)
    Skipped,
    
    /// Trigger execution failed
    Failed(String),
    
    /// Trigger execution timed out
    TimedOut,
    
    /// Trigger hit rate limit
    RateLimited,
}

/// Execute a trigger script in sandboxed environment
///
/// # Arguments
/// * `trigger` - Type of trigger (OnLook, OnUse, etc.)
/// * `script` - DSL script to execute
/// * `context` - Execution context with player/object/room state
/// * `store` - Storage for reading/writing game state
///
/// # Returns
/// Result of trigger execution with messages to send to player
pub fn execute_trigger(
    trigger: ObjectTrigger,
    script: &str,
    context: &mut TriggerContext,
    _store: &TinyMushStore,
) -> Result<TriggerResult, TinyMushError> {
    // Validate script length
    if script.is_empty() {
        return Ok(TriggerResult::NoScript);
    }
    
    if script.len() > MAX_SCRIPT_LENGTH {
        return Ok(TriggerResult::Failed(format!(
            "Script too long ({} > {} chars)",
            script.len(),
            MAX_SCRIPT_LENGTH
        )));
    }
    
    // Check for timeout before starting
    if context.is_timed_out() {
        return Ok(TriggerResult::TimedOut);
    }
    
    // TODO: Parse and execute script (Phase 2)
    // For now, just return a placeholder
    Ok(TriggerResult::Success(vec![
        format!("🎯 Trigger {:?} fired (not yet implemented)", trigger)
    ]))
}

/// Validate a trigger script for syntax errors
///
/// # Arguments
/// * `script` - DSL script to validate
///
/// # Returns
/// Ok if script is valid, Err with detailed error message if invalid
pub fn validate_script(script: &str) -> Result<(), String> {
    // Check length
    if script.is_empty() {
        return Err("Script cannot be empty".to_string());
    }
    
    if script.len() > MAX_SCRIPT_LENGTH {
        return Err(format!(
            "Script too long: {} characters (max {})",
            script.len(),
            MAX_SCRIPT_LENGTH
        ));
    }
    
    // TODO: Implement full syntax validation (Phase 2)
    // For now, just do basic checks
    
    // Check for balanced parentheses
    let mut depth = 0;
    for ch in script.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return Err("Unbalanced parentheses: too many ')'".to_string());
                }
            }
            _ => {}
        }
    }
    
    if depth != 0 {
        return Err("Unbalanced parentheses: unclosed '('".to_string());
    }
    
    Ok(())
}
