// ABOUTME: Wire and in-memory data model for drills, sessions, groups, and progress
// ABOUTME: snake_case JSON on the wire with null-tolerant numeric defaulting
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.

use crate::constants::{DEFAULT_DRILL_DURATION_MINUTES, DEFAULT_SETS_REPS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A drill template from the backend catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drill {
    /// Stable identifier used across sessions and groups
    pub uuid: Uuid,
    pub title: String,
    /// Primary skill this drill trains, e.g. "passing"
    pub skill: String,
    #[serde(default)]
    pub sub_skills: Vec<String>,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default)]
    pub training_styles: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tips: Vec<String>,
    /// Backend may send null for any of these; nulls collapse to defaults
    #[serde(default = "default_sets_reps", deserialize_with = "null_to_sets_reps")]
    pub sets: u32,
    #[serde(default = "default_sets_reps", deserialize_with = "null_to_sets_reps")]
    pub reps: u32,
    #[serde(default = "default_duration", deserialize_with = "null_to_duration")]
    pub duration: u32,
}

/// A drill inside the ordered session list, with session-local progress.
///
/// Owned exclusively by the ordered session list and synced as a whole list,
/// never per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDrillEntry {
    pub drill: Drill,
    #[serde(default)]
    pub sets_done: u32,
    #[serde(default)]
    pub is_completed: bool,
}

impl SessionDrillEntry {
    /// Wrap a catalog drill with zeroed progress
    #[must_use]
    pub const fn new(drill: Drill) -> Self {
        Self {
            drill,
            sets_done: 0,
            is_completed: false,
        }
    }
}

/// A named collection of drills; the liked group is a distinguished instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrillGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub drills: Vec<Drill>,
    /// True only for the single liked-drills group
    #[serde(default)]
    pub is_liked_group: bool,
}

impl DrillGroup {
    /// Create an empty saved group
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            description: description.to_owned(),
            drills: Vec::new(),
            is_liked_group: false,
        }
    }

    /// Create the distinguished liked-drills group
    #[must_use]
    pub fn liked() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: "Liked Drills".to_owned(),
            description: "Your favorite drills".to_owned(),
            drills: Vec::new(),
            is_liked_group: true,
        }
    }

    /// Whether the group already contains a drill
    #[must_use]
    pub fn contains(&self, drill_uuid: Uuid) -> bool {
        self.drills.iter().any(|d| d.uuid == drill_uuid)
    }
}

/// Saved session-generation filter preferences
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFilters {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub saved_time: Option<String>,
    #[serde(default)]
    pub saved_equipment: Vec<String>,
    #[serde(default)]
    pub saved_training_style: Option<String>,
    #[serde(default)]
    pub saved_location: Option<String>,
    #[serde(default)]
    pub saved_difficulty: Option<String>,
}

/// Preferences driving backend session generation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPreferences {
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub available_equipment: Vec<String>,
    #[serde(default)]
    pub training_style: Option<String>,
    #[serde(default)]
    pub training_location: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub target_skills: Vec<String>,
}

/// One finished training session as logged to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub date: DateTime<Utc>,
    pub drills: Vec<SessionDrillEntry>,
    pub total_completed_drills: u32,
    pub total_drills: u32,
}

/// Streak counters and lifetime completion count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressHistory {
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub highest_streak: u32,
    #[serde(default)]
    pub completed_sessions_count: u32,
}

/// Access and refresh token pair.
///
/// Persistence lives in the credential store; this type only moves tokens
/// between the refresh endpoint and that store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Successful login payload
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// One page of drill search results
#[derive(Debug, Clone, Deserialize)]
pub struct DrillSearchPage {
    #[serde(default)]
    pub items: Vec<Drill>,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub page: u32,
}

const fn default_duration() -> u32 {
    DEFAULT_DRILL_DURATION_MINUTES
}

const fn default_sets_reps() -> u32 {
    DEFAULT_SETS_REPS
}

fn null_to_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_DRILL_DURATION_MINUTES))
}

fn null_to_sets_reps<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(DEFAULT_SETS_REPS))
}
