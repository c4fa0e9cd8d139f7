//! Single-line encoding of scenarios for sharing between peers.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use skirmish_core::{MapLayout, SessionId, TileSpec};
use thiserror::Error;

use crate::scenario::{Scenario, Timing, UnitEntry};

const SNAPSHOT_DOMAIN: &str = "skirmish";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded scenario payload.
pub const SNAPSHOT_HEADER: &str = "skirmish:v1";
const FIELD_DELIMITER: char = ':';

/// Errors that can occur while decoding scenario transfer strings.
#[derive(Debug, Error)]
pub enum MapTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("transfer string was empty")]
    EmptyPayload,
    /// The prefix segment was missing.
    #[error("transfer string is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("transfer string is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("transfer string is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("transfer string is missing the payload")]
    MissingPayload,
    /// The prefix did not name this format.
    #[error("transfer prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The version is not understood.
    #[error("transfer version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode transfer payload: {0}")]
    InvalidEncoding(#[from] base64::DecodeError),
    /// The decoded payload was not a scenario.
    #[error("could not parse transfer payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct SerializableScenario {
    session: SessionId,
    tiles: Vec<TileSpec>,
    units: Vec<UnitEntry>,
    timing: Timing,
}

/// Encodes a scenario as `skirmish:v1:<columns>x<rows>:<payload>`.
pub fn encode(scenario: &Scenario) -> Result<String, MapTransferError> {
    let payload = SerializableScenario {
        session: scenario.session.clone(),
        tiles: scenario.layout.tiles.clone(),
        units: scenario.units.clone(),
        timing: scenario.timing,
    };
    let json = serde_json::to_vec(&payload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!(
        "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
        scenario.layout.columns, scenario.layout.rows
    ))
}

/// Decodes a scenario previously produced by [`encode`].
///
/// The tile list is not checked against the dimensions here; the world
/// rejects mismatched layouts when it is built.
pub fn decode(value: &str) -> Result<Scenario, MapTransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(MapTransferError::EmptyPayload);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(MapTransferError::MissingPrefix)?;
    let version = parts.next().ok_or(MapTransferError::MissingVersion)?;
    let dimensions = parts.next().ok_or(MapTransferError::MissingDimensions)?;
    let payload = parts.next().ok_or(MapTransferError::MissingPayload)?;

    if domain != SNAPSHOT_DOMAIN {
        return Err(MapTransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != SNAPSHOT_VERSION {
        return Err(MapTransferError::UnsupportedVersion(version.to_owned()));
    }

    let (columns, rows) = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD.decode(payload.as_bytes())?;
    let decoded: SerializableScenario = serde_json::from_slice(&bytes)?;

    Ok(Scenario {
        session: decoded.session,
        layout: MapLayout {
            columns,
            rows,
            tiles: decoded.tiles,
        },
        units: decoded.units,
        timing: decoded.timing,
    })
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), MapTransferError> {
    let invalid = || MapTransferError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<u32>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<u32>().map_err(|_| invalid())?;

    if columns == 0 || rows == 0 {
        return Err(invalid());
    }

    Ok((columns, rows))
}
