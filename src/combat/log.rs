//! Combat logging
//!
//! Records all combat events for display and post-battle analysis.

use bevy::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

use crate::battle::match_flow::CombatReport;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize)]
pub struct CombatLogEntry {
    /// Timestamp in battle time (seconds since the battle app started)
    pub timestamp: f32,
    /// The type of event
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatLogEventType {
    /// Damage dealt
    Damage,
    /// Hit that was dodged or blocked
    Avoided,
    /// Healing done
    Healing,
    /// Shield applied
    Shield,
    /// Ability used
    AbilityUsed,
    /// Summon performed
    Summon,
    /// Combatant died
    Death,
    /// Floating notification
    Notification,
    /// Battle event (start, end, etc.)
    MatchEvent,
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current battle time in seconds
    pub match_time: f32,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    report: &'a CombatReport,
    entries: &'a [CombatLogEntry],
}

impl CombatLog {
    /// Clear the log for a new battle
    pub fn clear(&mut self) {
        self.entries.clear();
        self.match_time = 0.0;
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.match_time,
            event_type,
            message,
        });
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get only HP-changing events (damage and healing)
    pub fn hp_changes_only(&self) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| {
                matches!(
                    e.event_type,
                    CombatLogEventType::Damage | CombatLogEventType::Healing
                )
            })
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Write the report and the full log as JSON. Returns the path written.
    pub fn save_to_file(&self, report: &CombatReport, output_path: Option<&str>) -> std::io::Result<String> {
        let path = match output_path {
            Some(p) => PathBuf::from(p),
            None => {
                let dir = PathBuf::from("match_logs");
                std::fs::create_dir_all(&dir)?;
                let stamp = std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or(0);
                dir.join(format!("battle_{}.json", stamp))
            }
        };
        let saved = SavedLog {
            report,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&saved).map_err(std::io::Error::other)?;
        std::fs::write(&path, json)?;
        Ok(path.display().to_string())
    }
}
