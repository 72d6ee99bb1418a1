/// Delivery tracker: pickup, drop, delivery and room completion.
///
/// Pickup and delivery run after the occupant index is synced, in that
/// order, followed by the completion check. A drop is an input edge and
/// runs before movement so the thrown item is validated like any step.
///
/// Mail state machine:
///   Free ──pickup──▶ Held ──drop──▶ Free
///     │                │
///     └────delivery────┴──▶ Delivered (disabled, kept by the mailbox)

use tracing::{debug, info};

use crate::domain::entity::{EntityId, MailState, Motion, Role};
use crate::domain::grid::GridPos;
use crate::domain::sprite::Sprite;
use super::event::GameEvent;
use super::transition;
use super::world::{Phase, WorldState};

pub fn resolve_delivery(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    resolve_pickup(world, events);
    resolve_mailboxes(world, events);
    resolve_completion(world, events);
}

/// Player standing on free mail with empty hands picks up the first one listed.
fn resolve_pickup(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.held().is_some() {
        return;
    }
    let pos = world.player().pos;
    let Some(mail) = first_free_mail(world, pos) else { return };

    world.store.relations.hold(world.player, mail);
    world.room.index.remove(mail);
    let m = &mut world.store[mail];
    m.role = Role::Mail(MailState::Held);
    m.enabled = false;
    m.velocity = None;
    debug!(mail = %mail, "mail picked up");
    events.push(GameEvent::MailPicked { mail });
}

/// Release the held item one cell in front of the player, moving away.
/// Called on the Fire release edge.
pub fn drop_held(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let Some(mail) = world.store.relations.release(world.player) else { return };
    let p = world.player();
    let (from, facing) = (p.pos, p.facing);
    let at = from + facing.delta();

    let m = &mut world.store[mail];
    m.role = Role::Mail(MailState::Free);
    m.enabled = true;
    m.prev = from;
    m.pos = at;
    m.facing = facing;
    m.velocity = Some(facing.delta());
    m.motion = Motion::at(from);
    debug!(mail = %mail, x = at.x, y = at.y, "mail dropped");
    events.push(GameEvent::MailDropped { mail, at });
}

/// Fill every empty mailbox that has mail on its cell. Free mail lying on
/// the cell wins over mail carried onto it.
fn resolve_mailboxes(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    let mailboxes: Vec<EntityId> = world.room.children.iter()
        .copied()
        .filter(|&id| {
            world.store.get(id).map_or(false, |e| {
                e.enabled && matches!(e.role, Role::Mailbox { full: false, .. })
            })
        })
        .collect();

    for mailbox in mailboxes {
        let pos = world.store[mailbox].pos;
        let mail = match first_free_mail(world, pos) {
            Some(m) => m,
            None => match world.held() {
                Some(h) if world.player().pos == pos => {
                    world.store.relations.release(world.player);
                    h
                }
                _ => continue,
            },
        };

        world.room.index.remove(mail);
        let m = &mut world.store[mail];
        m.role = Role::Mail(MailState::Delivered);
        m.enabled = false;
        m.velocity = None;

        let b = &mut world.store[mailbox];
        b.role = Role::Mailbox { full: true, delivered: Some(mail) };
        b.sprite = Sprite::MailboxFull;

        debug!(mail = %mail, mailbox = %mailbox, "mail delivered");
        events.push(GameEvent::MailDelivered { mail, mailbox });
    }
}

/// The room is solved the first time no enabled mailbox is empty.
fn resolve_completion(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.room.solved {
        return;
    }
    let (full, total) = world.mail_progress();
    if full < total {
        return;
    }

    world.room.solved = true;
    // Only solved rooms count; a restarted instance's deliveries are discarded with it.
    world.delivered += full as u32;
    let name = world.template().name.clone();
    info!(room = %name, "room solved");
    events.push(GameEvent::RoomSolved { room: name });

    let next = world.template().next;
    match next {
        Some(next) => transition::request(world, next),
        None => {
            world.phase = Phase::Complete;
            world.set_message("All mail delivered!", 0);
            info!(delivered = world.delivered, "game complete");
            events.push(GameEvent::GameComplete);
        }
    }
}

fn first_free_mail(world: &WorldState, pos: GridPos) -> Option<EntityId> {
    world.room.index.at(pos)
        .iter()
        .copied()
        .find(|&id| world.store.get(id).map_or(false, |e| e.is_free_mail()))
}
