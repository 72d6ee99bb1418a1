/// WorldState: the complete snapshot of a running game.
///
/// ## Ownership
///
///   - `rooms`:  validated templates. **Never mutated** after load.
///   - `store`:  every live entity and the relations between them.
///   - `room`:   the active instance: decorated terrain, the entities it
///                owns, its occupant index.
///   - `player`: lives in the store but belongs to no room; it is moved
///                between instances by the transition pass.
///
/// Every pass takes `&mut WorldState`; there is no other shared state.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::{GameConfig, SpeedConfig};
use crate::domain::entity::{Entity, EntityId, PlayerControls, Role};
use crate::domain::prefab;
use super::activation;
use super::level::LevelError;
use super::room::{RoomInstance, RoomTemplate, RoomView};
use super::store::EntityStore;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    /// The final room was solved.
    Complete,
}

pub struct WorldState {
    // ── Rooms ──
    pub rooms: Vec<RoomTemplate>,
    pub room: RoomInstance,
    /// Template index of a recorded `ChangeRoom`, executed next tick.
    pub pending: Option<usize>,

    // ── Entities ──
    pub store: EntityStore,
    pub player: EntityId,
    pub controls: PlayerControls,

    // ── Speed config ──
    pub speed: SpeedConfig,

    // ── Meta ──
    pub phase: Phase,
    pub tick: u64,
    /// Mail delivered in solved rooms over the whole run.
    pub delivered: u32,

    // ── UI ──
    pub message: String,
    pub message_timer: u32,

    // ── Decor ──
    rng: ChaCha8Rng,
    decor_chance: f64,
}

// ── Construction ──

impl WorldState {
    /// Build the first room and place the player at its spawn.
    pub fn new(rooms: Vec<RoomTemplate>, config: &GameConfig) -> Result<Self, LevelError> {
        let first = rooms.first().ok_or(LevelError::EmptyPack)?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.decor_seed);
        let mut store = EntityStore::new();
        let mut room = RoomInstance::build(0, first, &mut store, &mut rng, config.decor_chance);
        let player = store.spawn(prefab::PLAYER.instantiate(first.spawn));
        room.index.insert(player, first.spawn);
        let name = first.name.clone();

        let mut world = WorldState {
            rooms,
            room,
            pending: None,
            store,
            player,
            controls: PlayerControls::default(),
            speed: config.speed.clone(),
            phase: Phase::Playing,
            tick: 0,
            delivered: 0,
            message: String::new(),
            message_timer: 0,
            rng,
            decor_chance: config.decor_chance,
        };
        activation::settle(&mut world);
        world.set_message(&name, 120);
        info!(room = %name, "game started");
        Ok(world)
    }

    /// Build a fresh instance of template `idx` from the world's decor rng.
    pub(super) fn build_room(&mut self, idx: usize) -> RoomInstance {
        RoomInstance::build(idx, &self.rooms[idx], &mut self.store, &mut self.rng, self.decor_chance)
    }

    pub fn set_message(&mut self, msg: &str, duration: u32) {
        self.message = msg.to_string();
        self.message_timer = duration;
    }
}

// ── Queries ──

impl WorldState {
    pub fn template(&self) -> &RoomTemplate {
        &self.rooms[self.room.template]
    }

    pub fn player(&self) -> &Entity {
        &self.store[self.player]
    }

    /// Everything the per-tick passes iterate: the room's children, then the player.
    pub fn members(&self) -> Vec<EntityId> {
        let mut ids = self.room.children.clone();
        ids.push(self.player);
        ids
    }

    pub fn view(&self) -> RoomView<'_> {
        RoomView { room: &self.room, store: &self.store }
    }

    /// Item the player is carrying, if any.
    pub fn held(&self) -> Option<EntityId> {
        self.store.relations.held_by(self.player)
    }

    /// `(full, total)` over the active room's enabled mailboxes.
    pub fn mail_progress(&self) -> (usize, usize) {
        self.room.children.iter()
            .filter_map(|&id| self.store.get(id))
            .filter(|e| e.enabled)
            .filter_map(|e| match e.role {
                Role::Mailbox { full, .. } => Some(full),
                _ => None,
            })
            .fold((0, 0), |(f, t), full| (f + usize::from(full), t + 1))
    }
}
