//! Enumeration types shared across the auction service.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Round status
// ---------------------------------------------------------------------------

/// Lifecycle status of an auction round.
///
/// A round is created `Active` and transitions to `Closed` exactly once
/// (the close-once guarantee). There are no other states: "closing" is an
/// internal critical section, never an observable status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    /// The round is open and accepting bids.
    Active,
    /// The round has ended. Terminal.
    Closed,
}

impl RoundStatus {
    /// Return the canonical lowercase string used in storage and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

impl core::fmt::Display for RoundStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for RoundStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            other => Err(format!("unknown round status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Party role
// ---------------------------------------------------------------------------

/// The role a resolved identity acts under.
///
/// Provided by the identity collaborator on every inbound call; the core
/// trusts it and performs no authentication of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Owns a catalog and runs rounds.
    Host,
    /// Places bids on the active round's items.
    Bidder,
}

impl Role {
    /// Return the canonical lowercase string for this role.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Bidder => "bidder",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "bidder" => Ok(Self::Bidder),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
