//! Host session against a simulated heater controller over an in-memory link.
//!
//! Run with:
//!   cargo run --example simulated-device
//!
//! The device side answers Start/Stop/SetpointTemp with Ack + command, and
//! reports temperature, current and status after every host batch.

use heatlink::frame::{Expect, FrameDecoder, FrameEncoder, Kind, StatusWord};
use heatlink::session::Session;
use heatlink::transport::{MemoryTransport, Transport};

struct Device {
    link: MemoryTransport,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    setpoint: f32,
    temperature: f32,
    status: StatusWord,
}

impl Device {
    fn new(link: MemoryTransport) -> Self {
        Self {
            link,
            decoder: FrameDecoder::new(),
            encoder: FrameEncoder::new(),
            setpoint: 20.0,
            temperature: 20.0,
            status: StatusWord::empty(),
        }
    }

    /// Handle one host batch and answer with a report.
    fn step(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            let desc = self.decoder.decode_next(&mut self.link)?;
            if desc.is_end() {
                break;
            }
            match desc.kind() {
                Some(kind @ (Kind::Start | Kind::Stop)) => {
                    self.status.set(StatusWord::ACTIVE, kind == Kind::Start);
                    self.acknowledge(kind)?;
                }
                Some(Kind::SetpointTemp) => {
                    if let Some(value) = self.decoder.fetch_payload(Expect::Float) {
                        self.setpoint = value.as_f32().unwrap_or(self.setpoint);
                    }
                    self.acknowledge(Kind::SetpointTemp)?;
                }
                _ => {}
            }
        }

        if self.status.active() {
            self.temperature += (self.setpoint - self.temperature) * 0.3;
        }
        self.encoder.append_variable(Kind::ActualTemp, self.temperature)?;
        let current = if self.status.active() { 1.2f32 } else { 0.0 };
        self.encoder.append_variable(Kind::Current, current)?;
        self.encoder.append_variable(Kind::Status, self.status.bits() as i32)?;
        self.encoder.flush(&mut self.link)?;
        Ok(())
    }

    fn acknowledge(&mut self, command: Kind) -> Result<(), Box<dyn std::error::Error>> {
        self.encoder.append_flag(Kind::Ack)?;
        self.encoder.append_flag(command)?;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (host, mut device_end) = MemoryTransport::pair();
    device_end.open("sim0")?;
    let mut device = Device::new(device_end);

    let mut session = Session::new(host);
    session.connect("sim0")?;

    session.append_variable(Kind::SetpointTemp, 65.0f32)?;
    session.append_flag(Kind::Start)?;
    session.flush()?;

    for _ in 0..6 {
        device.step()?;
        session.drain(|message| match (&message.reply, message.status()) {
            (Some(reply), _) => println!("reply   {:?} accepted={}", reply.command, reply.accepted),
            (None, Some(status)) => println!("status  {status:?}"),
            (None, None) => println!(
                "{:<7} {}",
                message.descriptor.kind_name(),
                message.value().unwrap_or_default()
            ),
        })?;
    }

    session.append_flag(Kind::Stop)?;
    session.flush()?;
    device.step()?;
    session.drain(|message| println!("{:?}", message.reply))?;

    session.disconnect();
    Ok(())
}
