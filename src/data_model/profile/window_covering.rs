use std::{cmp::Ordering, sync::Arc};

use num::FromPrimitive;
use tracing::{debug, info, warn};

use crate::{
    data_model::{
        accessory::{Accessory, AccessoryInformation, Category, IdentifyHandler},
        characteristic::CharacteristicType,
        handler::{Handler, ServiceContext},
        service::{Service, ServiceType},
        Value,
    },
    Error, Result,
};

/// Optional characteristics enabled by the stock window covering
pub const DEFAULT_OPTIONAL: &[CharacteristicType] = &[
    CharacteristicType::Name,
    CharacteristicType::CurrentHorizontalTiltAngle,
    CharacteristicType::TargetHorizontalTiltAngle,
    CharacteristicType::ObstructionDetected,
];

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
pub enum PositionState {
    Closing = 0,
    Opening = 1,
    Stopped = 2,
}

impl PositionState {
    /// Direction of travel from `current` to `target`
    pub fn toward(current: u8, target: u8) -> Self {
        match target.cmp(&current) {
            Ordering::Less => PositionState::Closing,
            Ordering::Greater => PositionState::Opening,
            Ordering::Equal => PositionState::Stopped,
        }
    }

    pub fn of(ctx: &ServiceContext<'_>) -> Option<Self> {
        ctx.get(CharacteristicType::PositionState)
            .and_then(Value::as_u8)
            .and_then(Self::from_u8)
    }
}

impl From<PositionState> for Value {
    fn from(state: PositionState) -> Self {
        Value::UInt8(state as u8)
    }
}

/// Information for the stock window covering
pub fn information() -> AccessoryInformation {
    AccessoryInformation {
        name: "WindowCovering-01".into(),
        manufacturer: "Arduino HomeKit".into(),
        serial_number: "0123456".into(),
        model: "ESP8266/ESP32".into(),
        firmware_revision: "1.0".into(),
        hardware_revision: None,
    }
}

/// A window covering accessory, fully closed and stopped. The covering service is
/// primary and carries the `optional` characteristics besides the required ones.
pub fn accessory(
    aid: u64,
    info: &AccessoryInformation,
    optional: &[CharacteristicType],
    identify: Arc<dyn IdentifyHandler>,
) -> Result<Accessory> {
    let mut covering = Service::with_defaults(ServiceType::WindowCovering, optional)
        .primary()
        .value(CharacteristicType::PositionState, PositionState::Stopped)
        .value(CharacteristicType::CurrentPosition, 0u8)
        .value(CharacteristicType::TargetPosition, 0u8);
    if optional.contains(&CharacteristicType::Name) {
        covering = covering.value(CharacteristicType::Name, info.name.as_str());
    }
    Accessory::builder(aid, Category::WindowCovering)
        .service(info.service(identify))
        .service(covering)
        .build()
}

/// Reacts to controller writes on a window covering service.
///
/// Motion itself is simulated by [`step`], which the application calls from
/// its motor loop.
#[derive(Debug, Default)]
pub struct WindowCoveringHandler;

impl Handler for WindowCoveringHandler {
    fn handle_write(
        &mut self,
        ctx: &mut ServiceContext<'_>,
        written: CharacteristicType,
    ) -> Result<()> {
        match written {
            CharacteristicType::TargetPosition => retarget(ctx),
            CharacteristicType::HoldPosition => hold(ctx),
            CharacteristicType::TargetHorizontalTiltAngle => {
                mirror(ctx, written, CharacteristicType::CurrentHorizontalTiltAngle)
            }
            CharacteristicType::TargetVerticalTiltAngle => {
                mirror(ctx, written, CharacteristicType::CurrentVerticalTiltAngle)
            }
            _ => Ok(()),
        }
    }
}

fn position(ctx: &ServiceContext<'_>, kind: CharacteristicType) -> Result<u8> {
    ctx.get(kind)
        .and_then(Value::as_u8)
        .ok_or_else(|| Error::NotFound(format!("{kind:?} on accessory {}", ctx.aid())))
}

pub fn is_obstructed(ctx: &ServiceContext<'_>) -> bool {
    ctx.get(CharacteristicType::ObstructionDetected)
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn retarget(ctx: &mut ServiceContext<'_>) -> Result<()> {
    let current = position(ctx, CharacteristicType::CurrentPosition)?;
    let target = position(ctx, CharacteristicType::TargetPosition)?;
    let state = if is_obstructed(ctx) {
        PositionState::Stopped
    } else {
        PositionState::toward(current, target)
    };
    debug!("Covering {} moving {current} -> {target}: {state:?}", ctx.aid());
    ctx.set(CharacteristicType::PositionState, state)?;
    Ok(())
}

fn hold(ctx: &mut ServiceContext<'_>) -> Result<()> {
    // the request is a write-only trigger, re-arm it
    if !ctx.set(CharacteristicType::HoldPosition, false)? {
        return Ok(());
    }
    let current = position(ctx, CharacteristicType::CurrentPosition)?;
    info!("Covering {} held at {current}", ctx.aid());
    ctx.set(CharacteristicType::TargetPosition, current)?;
    ctx.set(CharacteristicType::PositionState, PositionState::Stopped)?;
    Ok(())
}

fn mirror(
    ctx: &mut ServiceContext<'_>,
    target: CharacteristicType,
    current: CharacteristicType,
) -> Result<()> {
    if !ctx.has(current) {
        return Ok(());
    }
    if let Some(angle) = ctx.get(target).cloned() {
        ctx.set(current, angle)?;
    }
    Ok(())
}

/// Moves the covering up to `increment` percent toward its target. Returns
/// whether it is still moving afterwards. Does nothing while obstructed.
/// A zero increment would never arrive and is rejected.
pub fn step(ctx: &mut ServiceContext<'_>, increment: u8) -> Result<bool> {
    if increment == 0 {
        return Err(Error::InvalidValue(CharacteristicType::CurrentPosition));
    }
    if is_obstructed(ctx) {
        return Ok(false);
    }
    let current = position(ctx, CharacteristicType::CurrentPosition)?;
    let target = position(ctx, CharacteristicType::TargetPosition)?;
    let next = match PositionState::toward(current, target) {
        PositionState::Opening => current.saturating_add(increment).min(target),
        PositionState::Closing => current.saturating_sub(increment).max(target),
        PositionState::Stopped => current,
    };
    ctx.set(CharacteristicType::CurrentPosition, next)?;
    if next == target {
        if ctx.set(CharacteristicType::PositionState, PositionState::Stopped)? {
            info!("Covering {} reached {target}", ctx.aid());
        }
        return Ok(false);
    }
    Ok(true)
}

/// Records an obstruction. Motion stops while it is set and resumes toward the
/// target once it is cleared.
pub fn set_obstructed(ctx: &mut ServiceContext<'_>, obstructed: bool) -> Result<()> {
    if !ctx.set(CharacteristicType::ObstructionDetected, obstructed)? {
        return Ok(());
    }
    if obstructed {
        warn!("Covering {} obstructed, stopping", ctx.aid());
        ctx.set(CharacteristicType::PositionState, PositionState::Stopped)?;
        Ok(())
    } else {
        retarget(ctx)
    }
}
