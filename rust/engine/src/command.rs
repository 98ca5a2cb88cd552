// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command dispatch for the external document transport.
//!
//! | command | parameters | response |
//! |---|---|---|
//! | `Create{Type}` | `{ <collection>: [descriptor] }` | `{ applicationObjects: [result] }` |
//! | `Get{Type}Data` | `{ applicationIds, sendProperties?, sendListingParameters? }` | `{ <collection>: [descriptor] }` |
//! | `GetElementIds` | `{ elementTypes? }` | `{ applicationIds }` |
//! | `GetElementTypes` | `{ applicationIds }` | `{ elements: [{ applicationId, elementType }] }` |
//! | `FinishReceiveTransaction` | none | `{}` |

use crate::error::CommandError;
use crate::extract::ExportOptions;
use crate::host::HostModel;
use crate::session::SyncSession;
use bimsync_core::{keys, Descriptor, ElementType, ExternalId, InternalId, SynchronizationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandRequest {
    pub command_name: String,
    #[serde(default)]
    pub parameters: Value,
}

impl CommandRequest {
    pub fn new(command_name: impl Into<String>, parameters: Value) -> Self {
        Self {
            command_name: command_name.into(),
            parameters,
        }
    }
}

/// Parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Create(ElementType),
    GetData(ElementType),
    GetElementIds,
    GetElementTypes,
    FinishReceiveTransaction,
}

impl Command {
    pub fn parse(name: &str) -> Option<Command> {
        match name {
            "GetElementIds" => return Some(Command::GetElementIds),
            "GetElementTypes" => return Some(Command::GetElementTypes),
            "FinishReceiveTransaction" => return Some(Command::FinishReceiveTransaction),
            _ => {}
        }
        ElementType::ALL.iter().find_map(|t| {
            if t.create_command() == name {
                Some(Command::Create(*t))
            } else if t.data_command() == name {
                Some(Command::GetData(*t))
            } else {
                None
            }
        })
    }

    /// Every command the dispatcher understands.
    pub fn names() -> Vec<String> {
        let mut names: Vec<String> = ElementType::ALL
            .iter()
            .flat_map(|t| [t.create_command(), t.data_command()])
            .collect();
        names.extend(
            ["GetElementIds", "GetElementTypes", "FinishReceiveTransaction"]
                .iter()
                .map(|s| s.to_string()),
        );
        names
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataParameters {
    #[serde(default)]
    application_ids: Vec<String>,
    send_properties: Option<bool>,
    send_listing_parameters: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementIdsParameters {
    #[serde(default)]
    element_types: Option<Vec<String>>,
}

/// Ids that do not parse are dropped, like ids that do not resolve.
fn parse_ids(ids: &[String]) -> Vec<InternalId> {
    ids.iter().filter_map(|s| s.parse().ok()).collect()
}

fn parameters<T: for<'de> Deserialize<'de> + Default>(value: &Value) -> Result<T, CommandError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| CommandError::InvalidParameters(e.to_string()))
}

/// Run one command against `session`.
pub fn execute<H: HostModel>(session: &mut SyncSession<H>, request: &CommandRequest) -> Result<Value, CommandError> {
    let command = Command::parse(&request.command_name)
        .ok_or_else(|| CommandError::UnknownCommand(request.command_name.clone()))?;
    tracing::debug!(command = %request.command_name, "Executing command");

    match command {
        Command::Create(element_type) => {
            let key = element_type.collection_field();
            let items: &[Value] = match request.parameters.get(key) {
                Some(Value::Array(items)) => items.as_slice(),
                Some(_) => return Err(CommandError::InvalidParameters(format!("'{}' must be an array", key))),
                None => &[],
            };

            // Entries that are not descriptors fail on their own; the rest still run.
            let mut slots: Vec<Option<SynchronizationResult>> = Vec::with_capacity(items.len());
            let mut descriptors = Vec::with_capacity(items.len());
            for (position, item) in items.iter().enumerate() {
                match Descriptor::from_value(item.clone()) {
                    Ok(desc) => {
                        descriptors.push(desc);
                        slots.push(None);
                    }
                    Err(e) => {
                        tracing::warn!(position, error = %e, "Rejected batch entry");
                        let id = item.get(keys::ID).and_then(Value::as_str).unwrap_or_default();
                        slots.push(Some(SynchronizationResult::failed(
                            ExternalId::new(id),
                            vec![format!("{}[{}] is not an element descriptor", key, position)],
                            e.to_string(),
                        )));
                    }
                }
            }

            let batch = session.synchronize(element_type, &descriptors)?;
            let mut built = batch.results.into_iter();
            let results: Vec<SynchronizationResult> = slots
                .into_iter()
                .filter_map(|slot| slot.or_else(|| built.next()))
                .collect();
            Ok(json!({ "applicationObjects": results }))
        }
        Command::GetData(element_type) => {
            let params: DataParameters = parameters(&request.parameters)?;
            let defaults = session.options().export();
            let options = ExportOptions {
                send_properties: params.send_properties.unwrap_or(defaults.send_properties),
                send_listing_parameters: params
                    .send_listing_parameters
                    .unwrap_or(defaults.send_listing_parameters),
            };
            let records = session.extract(element_type, &parse_ids(&params.application_ids), options);
            let mut response = serde_json::Map::new();
            response.insert(element_type.collection_field().to_string(), serde_json::to_value(records)?);
            Ok(Value::Object(response))
        }
        Command::GetElementIds => {
            let params: ElementIdsParameters = parameters(&request.parameters)?;
            let types = match params.element_types {
                Some(names) => names
                    .iter()
                    .map(|n| n.parse::<ElementType>())
                    .collect::<Result<Vec<_>, _>>()
                    .map_err(|e| CommandError::InvalidParameters(e.to_string()))?,
                None => ElementType::ALL.to_vec(),
            };
            let ids: Vec<String> = session.element_ids(&types).iter().map(|g| g.to_string()).collect();
            Ok(json!({ "applicationIds": ids }))
        }
        Command::GetElementTypes => {
            let params: DataParameters = parameters(&request.parameters)?;
            let elements: Vec<Value> = session
                .element_types(&parse_ids(&params.application_ids))
                .into_iter()
                .map(|(guid, t)| json!({ "applicationId": guid.to_string(), "elementType": t.as_str() }))
                .collect();
            Ok(json!({ "elements": elements }))
        }
        Command::FinishReceiveTransaction => {
            session.finish_transaction();
            Ok(json!({}))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_names() {
        assert_eq!(Command::parse("CreateWall"), Some(Command::Create(ElementType::Wall)));
        assert_eq!(
            Command::parse("GetGridElementData"),
            Some(Command::GetData(ElementType::GridElement))
        );
        assert_eq!(Command::parse("FinishReceiveTransaction"), Some(Command::FinishReceiveTransaction));
        assert_eq!(Command::parse("DeleteWall"), None);
        assert_eq!(Command::names().len(), ElementType::ALL.len() * 2 + 3);
    }

    #[test]
    fn test_request_wire_shape() {
        let request: CommandRequest = serde_json::from_value(json!({
            "commandName": "GetElementIds",
        }))
        .unwrap();
        assert_eq!(request.command_name, "GetElementIds");
        assert!(request.parameters.is_null());
    }
}
