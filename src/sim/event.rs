/// Events emitted during a simulation step.
/// The presentation layer consumes these for messages and sound.

use crate::domain::entity::EntityId;
use crate::domain::grid::GridPos;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    MailPicked { mail: EntityId },
    MailDropped { mail: EntityId, at: GridPos },
    MailDelivered { mail: EntityId, mailbox: EntityId },
    BoxPushed { id: EntityId, to: GridPos },
    PlateChanged { plate: EntityId, active: bool },
    GateChanged { gate: EntityId, open: bool },
    RoomSolved { room: String },
    RoomEntered { room: String },
    GameComplete,
}
