use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use heatlink_frame::Payload;
use heatlink_session::{Message, Reply};
use heatlink_transport::EndpointInfo;
use serde::Serialize;
use serde_json::Value as JsonValue;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    kind: &'a str,
    code: u8,
    class: &'a str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<Vec<&'static str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyOutput<'a>>,
    timestamp: String,
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    accepted: bool,
    command: Option<&'a str>,
}

impl<'a> From<&'a Reply> for ReplyOutput<'a> {
    fn from(reply: &'a Reply) -> Self {
        Self {
            accepted: reply.accepted,
            command: reply.command.map(|kind| kind.name()),
        }
    }
}

#[derive(Serialize)]
struct EndpointOutput<'a> {
    name: &'a str,
    description: &'a str,
    hardware_id: &'a str,
}

pub fn print_message(message: &Message, format: OutputFormat) {
    let status = message
        .status()
        .map(|word| word.iter_names().map(|(name, _)| name).collect::<Vec<_>>());

    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                kind: message.descriptor.kind_name(),
                code: message.descriptor.code,
                class: message.descriptor.class.name(),
                size: message.descriptor.declared_size,
                value: message.payload.as_ref().map(payload_json),
                status,
                reply: message.reply.as_ref().map(ReplyOutput::from),
                timestamp: now_unix_millis(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "CLASS", "SIZE", "VALUE"])
                .add_row(vec![
                    message.descriptor.kind_name().to_string(),
                    message.descriptor.class.name().to_string(),
                    message.descriptor.declared_size.to_string(),
                    summary(message, status.as_deref()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{:<13} {}",
                message.descriptor.kind_name(),
                summary(message, status.as_deref())
            );
        }
    }
}

pub fn print_endpoints(endpoints: &[EndpointInfo], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<_> = endpoints
                .iter()
                .map(|ep| EndpointOutput {
                    name: &ep.name,
                    description: &ep.description,
                    hardware_id: &ep.hardware_id,
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "[]".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "DESCRIPTION", "HARDWARE ID"]);
            for ep in endpoints {
                table.add_row(vec![
                    ep.name.clone(),
                    ep.description.clone(),
                    ep.hardware_id.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if endpoints.is_empty() {
                println!("no serial ports found");
            }
            for ep in endpoints {
                if ep.description.is_empty() {
                    println!("{}", ep.name);
                } else {
                    println!("{}  {}", ep.name, ep.description);
                }
            }
        }
    }
}

fn summary(message: &Message, status: Option<&[&str]>) -> String {
    if let Some(reply) = &message.reply {
        let verdict = if reply.accepted { "accepted" } else { "rejected" };
        return match reply.command {
            Some(kind) => format!("{kind} {verdict}"),
            None => verdict.to_string(),
        };
    }
    if let Some(flags) = status {
        return if flags.is_empty() {
            "idle".to_string()
        } else {
            flags.join("|")
        };
    }
    message
        .payload
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default()
}

fn payload_json(payload: &Payload) -> JsonValue {
    match payload {
        Payload::Int(v) => JsonValue::from(*v),
        Payload::Float(v) => JsonValue::from(f64::from(*v)),
        Payload::Text(s) => JsonValue::from(s.as_str()),
        Payload::Bytes(b) => JsonValue::from(b.to_vec()),
    }
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use heatlink_frame::{Class, Descriptor, Kind};

    use super::*;

    fn message(kind: Kind, class: Class, payload: Option<Payload>) -> Message {
        Message {
            descriptor: Descriptor {
                code: kind.code(),
                class,
                declared_size: if class == Class::Variable { 4 } else { 0 },
            },
            payload,
            reply: None,
        }
    }

    #[test]
    fn summary_names_status_bits() {
        let msg = message(Kind::Status, Class::Variable, Some(Payload::Int(0b1001)));
        let status = msg
            .status()
            .map(|word| word.iter_names().map(|(name, _)| name).collect::<Vec<_>>());
        assert_eq!(summary(&msg, status.as_deref()), "ACTIVE|FAULT");
    }

    #[test]
    fn summary_describes_replies() {
        let mut msg = message(Kind::Nack, Class::Flag, None);
        msg.reply = Some(Reply {
            accepted: false,
            command: Some(Kind::Start),
        });
        assert_eq!(summary(&msg, None), format!("{} rejected", Kind::Start));
    }

    #[test]
    fn float_payload_serializes_as_number() {
        assert!(payload_json(&Payload::Float(21.5)).is_number());
        assert_eq!(payload_json(&Payload::Text("ok".into())), JsonValue::from("ok"));
    }
}
