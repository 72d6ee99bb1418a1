/// The step function: advances the world by one tick.
///
/// Processing order:
///   1. Pending room transition (held levels update, nothing else)
///   2. Otherwise input, then the player step from the held direction
///   3. Velocity steps
///   4. Movement resolution (commit / revert)
///   5. Push propagation
///   6. Occupant index sync
///   7. Plates → wiring → gates
///   8. Pickup → delivery → room completion
///   9. Commit previous positions
///  10. Animation (pixel motion, sprites)
///
/// The order is the correctness mechanism: movement and push read the
/// index as it was before this tick, activation and delivery read it
/// after. Nothing here touches a screen.

use crate::domain::entity::{InputIntent, IntentKind, MovingState};
use crate::domain::sprite::Sprite;
use super::event::GameEvent;
use super::world::{Phase, WorldState};
use super::{activation, delivery, movement, transition};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, intents: &[InputIntent]) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    if world.message_timer > 0 {
        world.message_timer -= 1;
        if world.message_timer == 0 { world.message.clear(); }
    }

    if transition::resolve_transition(world, &mut events) {
        // Edges still update held levels; nothing acts on them this tick.
        for &intent in intents {
            world.controls.apply(intent);
        }
    } else {
        resolve_input(world, intents, &mut events);
        movement::resolve_player_step(world);
    }
    movement::resolve_velocity(world);
    movement::resolve_movement(world);
    movement::resolve_push(world, &mut events);
    resolve_occupancy(world);
    activation::resolve_activation(world, &mut events);
    delivery::resolve_delivery(world, &mut events);
    resolve_commit(world);
    resolve_animation(world);

    events
}

// ══════════════════════════════════════════════════════════════
// Input
// ══════════════════════════════════════════════════════════════

/// Directions are levels (held state), Fire and Restart act on release.
fn resolve_input(world: &mut WorldState, intents: &[InputIntent], events: &mut Vec<GameEvent>) {
    for &intent in intents {
        match intent.kind {
            IntentKind::Up | IntentKind::Down | IntentKind::Left | IntentKind::Right => {
                if let Some(facing) = world.controls.apply(intent) {
                    if intent.pressed {
                        let player = world.player;
                        world.store[player].facing = facing;
                    }
                }
            }
            IntentKind::Fire => {
                if !intent.pressed {
                    delivery::drop_held(world, events);
                }
            }
            IntentKind::Restart => {
                if !intent.pressed {
                    let current = world.room.template;
                    transition::request(world, current);
                }
            }
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Bookkeeping
// ══════════════════════════════════════════════════════════════

fn resolve_occupancy(world: &mut WorldState) {
    let members = world.members();
    world.room.index.sync(&world.store, members);
}

fn resolve_commit(world: &mut WorldState) {
    for id in world.members() {
        let e = &mut world.store[id];
        e.prev = e.pos;
    }
}

fn resolve_animation(world: &mut WorldState) {
    let speed = world.speed.walk_px_per_tick;
    for id in world.members() {
        let e = &mut world.store[id];
        if !e.enabled { continue; }
        e.motion.advance(e.pos, speed);
        if e.is_player() {
            e.sprite = Sprite::player(e.facing, e.motion.state == MovingState::Moving);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::domain::entity::{EntityId, MailState, Role};
    use crate::domain::grid::{Facing, GridPos, ROOM_HEIGHT, ROOM_WIDTH};
    use crate::sim::level;
    use crate::sim::view::render_list;

    fn config() -> GameConfig {
        let mut c = GameConfig::default();
        c.speed.walk_px_per_tick = 16;
        c.decor_chance = 0.0;
        c
    }

    /// Wall-enclosed room; `rows` replace individual map rows.
    fn layout(header: &str, rows: &[(usize, &str)]) -> String {
        let mut text = format!("{header}\n");
        for y in 0..ROOM_HEIGHT {
            let row = if let Some(&(_, r)) = rows.iter().find(|(ry, _)| *ry == y) {
                r.to_string()
            } else if y == 0 || y == ROOM_HEIGHT - 1 {
                "#".repeat(ROOM_WIDTH)
            } else {
                format!("#{}#", ".".repeat(ROOM_WIDTH - 2))
            };
            text.push_str(&row);
            text.push('\n');
        }
        text
    }

    fn world_of(texts: &[&str]) -> WorldState {
        WorldState::new(level::parse_pack(texts).unwrap(), &config()).unwrap()
    }

    fn embedded_world() -> WorldState {
        WorldState::new(level::embedded_rooms().unwrap(), &config()).unwrap()
    }

    fn kind(f: Facing) -> IntentKind {
        match f {
            Facing::Up => IntentKind::Up,
            Facing::Down => IntentKind::Down,
            Facing::Left => IntentKind::Left,
            Facing::Right => IntentKind::Right,
        }
    }

    /// Hold `dir` for `cells` ticks, then release it on one more tick.
    fn walk(world: &mut WorldState, dir: Facing, cells: usize) -> Vec<GameEvent> {
        let mut events = step(world, &[InputIntent::press(kind(dir))]);
        for _ in 1..cells {
            events.extend(step(world, &[]));
        }
        events.extend(step(world, &[InputIntent::release(kind(dir))]));
        events
    }

    fn throw(world: &mut WorldState) -> Vec<GameEvent> {
        let mut events = step(world, &[InputIntent::press(IntentKind::Fire)]);
        events.extend(step(world, &[InputIntent::release(IntentKind::Fire)]));
        events
    }

    fn pos_of(world: &WorldState, id: EntityId) -> GridPos {
        world.store[id].pos
    }

    fn gate_open(world: &WorldState, id: EntityId) -> bool {
        matches!(world.store[id].role, Role::Gate { open: true })
    }

    // ── Movement ──

    #[test]
    fn solid_terrain_blocks_all_directions() {
        let text = layout("# Pocket\n@ spawn 2,2", &[
            (1, "#.T................#"),
            (2, "#T.T...............#"),
            (3, "#.T................#"),
        ]);
        let mut world = world_of(&[&text]);
        for dir in [Facing::Up, Facing::Down, Facing::Left, Facing::Right] {
            walk(&mut world, dir, 1);
            assert_eq!(world.player().pos, GridPos::new(2, 2), "{dir:?}");
            assert_eq!(world.player().prev, GridPos::new(2, 2));
        }
    }

    #[test]
    fn mailbox_front_blocks_player_not_thrown_mail() {
        let text = layout("# Front\n@ spawn 2,2\n+ mail 2,2", &[(2, "#..=...............#")]);
        let mut world = world_of(&[&text]);
        let mail = world.room.children[0];

        step(&mut world, &[]);
        assert_eq!(world.held(), Some(mail));

        walk(&mut world, Facing::Right, 1);
        assert_eq!(world.player().pos, GridPos::new(2, 2));
        assert_eq!(world.player().facing, Facing::Right);

        throw(&mut world);
        for _ in 0..20 {
            step(&mut world, &[]);
        }
        let m = &world.store[mail];
        assert_eq!(m.pos, GridPos::new(18, 2));
        assert_eq!(m.velocity, None);
        assert_eq!(m.role, Role::Mail(MailState::Free));
    }

    #[test]
    fn closed_gate_blocks_player() {
        let text = layout("# Gate\n@ spawn 2,2", &[(2, "#..G...............#")]);
        let mut world = world_of(&[&text]);
        walk(&mut world, Facing::Right, 2);
        assert_eq!(world.player().pos, GridPos::new(2, 2));
    }

    #[test]
    fn walking_takes_one_cell_per_animation() {
        let text = layout("# Walk\n@ spawn 2,2", &[]);
        let mut cfg = config();
        cfg.speed.walk_px_per_tick = 2;
        let mut world = WorldState::new(level::parse_pack(&[&text]).unwrap(), &cfg).unwrap();

        step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        assert_eq!(world.player().pos, GridPos::new(3, 2));
        assert_eq!(world.player().sprite, Sprite::PlayerWalk(Facing::Right));
        for _ in 0..7 {
            step(&mut world, &[]);
        }
        assert_eq!(world.player().pos, GridPos::new(3, 2));
        assert!(world.player().motion.is_inactive());
        assert_eq!(world.player().sprite, Sprite::PlayerIdle(Facing::Right));
        step(&mut world, &[]);
        assert_eq!(world.player().pos, GridPos::new(4, 2));
    }

    // ── Push ──

    #[test]
    fn push_moves_adjacent_box() {
        let text = layout("# Push\n@ spawn 1,1", &[(1, "#.B................#")]);
        let mut world = world_of(&[&text]);
        let bx = world.room.children[0];
        let events = step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        assert_eq!(world.player().pos, GridPos::new(2, 1));
        assert_eq!(pos_of(&world, bx), GridPos::new(3, 1));
        assert_eq!(world.store[bx].prev, GridPos::new(3, 1));
        assert!(events.contains(&GameEvent::BoxPushed { id: bx, to: GridPos::new(3, 1) }));
        assert_eq!(world.room.index.cell_of(bx), Some(GridPos::new(3, 1)));
    }

    #[test]
    fn push_is_one_object_deep() {
        let text = layout("# Chain\n@ spawn 1,1", &[(1, "#.BB...............#")]);
        let mut world = world_of(&[&text]);
        let (first, second) = (world.room.children[0], world.room.children[1]);
        walk(&mut world, Facing::Right, 3);
        assert_eq!(world.player().pos, GridPos::new(1, 1));
        assert_eq!(pos_of(&world, first), GridPos::new(2, 1));
        assert_eq!(pos_of(&world, second), GridPos::new(3, 1));
    }

    #[test]
    fn box_stops_at_wall() {
        let text = layout("# Wall\n@ spawn 15,1", &[(1, "#...............B..#")]);
        let mut world = world_of(&[&text]);
        let bx = world.room.children[0];
        walk(&mut world, Facing::Right, 5);
        assert_eq!(pos_of(&world, bx), GridPos::new(18, 1));
        assert_eq!(world.player().pos, GridPos::new(17, 1));
    }

    // ── Activation ──

    fn plate_room() -> WorldState {
        let text = layout("# Plate\n@ spawn 2,2\n~ 0>1 0>2", &[(2, "#..P.G.I...........#")]);
        world_of(&[&text])
    }

    #[test]
    fn plate_opens_gate_in_same_tick_and_closes_on_leave() {
        let mut world = plate_room();
        let gate = world.room.children[1];
        assert!(!gate_open(&world, gate));

        step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        assert_eq!(world.player().pos, GridPos::new(3, 2));
        assert!(gate_open(&world, gate));

        step(&mut world, &[
            InputIntent::release(IntentKind::Right),
            InputIntent::press(IntentKind::Down),
        ]);
        assert_eq!(world.player().pos, GridPos::new(3, 3));
        assert!(!gate_open(&world, gate));
        assert_eq!(world.store[gate].collision, crate::domain::tile::Tile::Solid);
    }

    #[test]
    fn inverted_gate_has_opposite_polarity_every_tick() {
        let mut world = plate_room();
        let (gate, inverted) = (world.room.children[1], world.room.children[2]);
        assert_ne!(gate_open(&world, gate), gate_open(&world, inverted));
        let script = [
            vec![InputIntent::press(IntentKind::Right)],
            vec![InputIntent::release(IntentKind::Right)],
            vec![InputIntent::press(IntentKind::Down)],
            vec![InputIntent::release(IntentKind::Down), InputIntent::press(IntentKind::Up)],
            vec![InputIntent::release(IntentKind::Up)],
            vec![],
        ];
        for intents in &script {
            step(&mut world, intents);
            assert_ne!(gate_open(&world, gate), gate_open(&world, inverted));
        }
    }

    #[test]
    fn box_on_plate_keeps_gate_open() {
        let mut world = embedded_world();
        world.pending = Some(1);
        step(&mut world, &[]);
        assert_eq!(world.template().name, "Heavy Post");
        let (bx, gate) = (world.room.children[2], world.room.children[4]);

        walk(&mut world, Facing::Up, 4); // (3,6)
        assert!(!gate_open(&world, gate));
        walk(&mut world, Facing::Right, 2); // box (4,6) → (6,6)
        assert_eq!(pos_of(&world, bx), GridPos::new(6, 6));
        assert!(gate_open(&world, gate));

        walk(&mut world, Facing::Up, 1);
        walk(&mut world, Facing::Right, 3);
        walk(&mut world, Facing::Down, 1);
        walk(&mut world, Facing::Right, 1);
        assert_eq!(world.player().pos, GridPos::new(9, 6));
    }

    // ── Delivery & transitions ──

    #[test]
    fn scenario_first_delivery() {
        let mut world = embedded_world();
        assert_eq!(world.template().name, "First Delivery");
        assert_eq!(world.player().pos, GridPos::new(16, 7));
        let (mail, mailbox) = (world.room.children[0], world.room.children[1]);

        walk(&mut world, Facing::Left, 11);
        let events = walk(&mut world, Facing::Up, 3);
        assert_eq!(world.player().pos, GridPos::new(5, 4));
        assert!(events.contains(&GameEvent::MailPicked { mail }));
        assert_eq!(world.held(), Some(mail));
        assert!(!world.store[mail].enabled);
        assert_eq!(world.room.index.cell_of(mail), None);
        assert!(render_list(&world).iter().all(|i| i.id != mail));

        walk(&mut world, Facing::Down, 4);
        let events = step(&mut world, &[InputIntent::press(IntentKind::Left)]);
        assert_eq!(world.player().pos, GridPos::new(4, 8));
        assert!(events.contains(&GameEvent::MailDelivered { mail, mailbox }));
        assert!(events.contains(&GameEvent::RoomSolved { room: "First Delivery".into() }));
        assert_eq!(world.store[mailbox].role, Role::Mailbox { full: true, delivered: Some(mail) });
        assert_eq!(world.store[mailbox].sprite, Sprite::MailboxFull);
        assert_eq!(world.pending, Some(1));
        // Still the same room for this tick.
        assert_eq!(world.template().name, "First Delivery");

        let events = step(&mut world, &[
            InputIntent::release(IntentKind::Left),
            InputIntent::press(IntentKind::Up),
        ]);
        assert!(events.contains(&GameEvent::RoomEntered { room: "Heavy Post".into() }));
        assert_eq!(world.template().name, "Heavy Post");
        assert_eq!(world.player().pos, GridPos::new(3, 10));
        assert_eq!(world.pending, None);
        assert_eq!(world.held(), None);
        assert_eq!(world.delivered, 1);

        // The transition tick only recorded the edges; Up is still held.
        assert_eq!(world.controls.desired(), Some(Facing::Up));
        step(&mut world, &[]);
        assert_eq!(world.player().pos, GridPos::new(3, 9));

        // Old room is gone without a trace.
        assert!(world.store.get(mail).is_none());
        assert!(world.store.get(mailbox).is_none());
        assert_eq!(world.store.len(), world.room.children.len() + 1);
        for (plate, gate) in world.store.relations.edges() {
            assert!(world.store.contains(plate) && world.store.contains(gate));
        }
        assert_eq!(world.room.index.len(), world.room.children.len() + 1);
    }

    #[test]
    fn final_room_completes_game() {
        let text = layout("# Last\n@ spawn 2,2", &[(2, "#..MX..............#")]);
        let mut world = world_of(&[&text]);
        step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        assert!(world.held().is_some());
        let events = step(&mut world, &[]);
        assert_eq!(world.phase, Phase::Complete);
        assert_eq!(events.last(), Some(&GameEvent::GameComplete));
        assert_eq!(world.pending, None);
        assert!(step(&mut world, &[InputIntent::press(IntentKind::Left)]).is_empty());
        assert_eq!(world.mail_progress(), (1, 1));
    }

    #[test]
    fn thrown_mail_fills_mailbox() {
        let text = layout("# Throw\n@ spawn 2,2\n+ mail 2,2", &[(2, "#....X.............#")]);
        let mut world = world_of(&[&text]);
        let mail = world.room.children[0];
        step(&mut world, &[]);
        walk(&mut world, Facing::Right, 1);
        assert_eq!(world.player().pos, GridPos::new(3, 2));

        let events = throw(&mut world);
        assert!(events.contains(&GameEvent::MailDropped { mail, at: GridPos::new(4, 2) }));
        step(&mut world, &[]);
        assert_eq!(world.store[mail].role, Role::Mail(MailState::Delivered));
        assert_eq!(world.phase, Phase::Complete);
    }

    #[test]
    fn blocked_drop_is_picked_up_again() {
        let text = layout("# Wall\n@ spawn 1,2\n+ mail 1,2", &[]);
        let mut world = world_of(&[&text]);
        let mail = world.room.children[0];
        step(&mut world, &[]);
        walk(&mut world, Facing::Left, 1);
        let events = throw(&mut world);
        assert!(events.contains(&GameEvent::MailDropped { mail, at: GridPos::new(0, 2) }));
        assert!(events.contains(&GameEvent::MailPicked { mail }));
        assert_eq!(world.held(), Some(mail));
    }

    /// Two mail side by side, a mailbox right after them, a second mailbox
    /// further down.
    fn sorting_room() -> WorldState {
        let text = layout("# Sorting\n@ spawn 2,2", &[
            (2, "#..MMX.............#"),
            (4, "#........X.........#"),
        ]);
        world_of(&[&text])
    }

    #[test]
    fn pickup_while_holding_and_full_mailbox_are_ignored() {
        let mut world = sorting_room();
        let (first, second, mailbox) =
            (world.room.children[0], world.room.children[1], world.room.children[2]);

        step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        assert_eq!(world.held(), Some(first));
        step(&mut world, &[]);
        assert_eq!(world.player().pos, GridPos::new(4, 2));
        assert_eq!(world.held(), Some(first));
        assert_eq!(world.store[second].role, Role::Mail(MailState::Free));
        assert_eq!(world.room.index.cell_of(second), Some(GridPos::new(4, 2)));

        step(&mut world, &[]);
        step(&mut world, &[InputIntent::release(IntentKind::Right)]);
        assert_eq!(world.player().pos, GridPos::new(5, 2));
        let filled = Role::Mailbox { full: true, delivered: Some(first) };
        assert_eq!(world.store[mailbox].role, filled);

        // Carried onto the full mailbox: still held.
        walk(&mut world, Facing::Left, 1);
        assert_eq!(world.held(), Some(second));
        walk(&mut world, Facing::Right, 1);
        assert_eq!(world.player().pos, GridPos::new(5, 2));
        assert_eq!(world.held(), Some(second));
        assert_eq!(world.store[mailbox].role, filled);

        // Thrown onto it from the other side: lies there free.
        walk(&mut world, Facing::Right, 2);
        walk(&mut world, Facing::Left, 1);
        assert_eq!(world.player().pos, GridPos::new(6, 2));
        let events = throw(&mut world);
        assert!(events.contains(&GameEvent::MailDropped { mail: second, at: GridPos::new(5, 2) }));
        assert!(!events.iter().any(|e| matches!(e, GameEvent::MailDelivered { .. })));
        assert_eq!(pos_of(&world, second), GridPos::new(5, 2));
        assert_eq!(world.store[second].role, Role::Mail(MailState::Free));
        assert_eq!(world.room.index.cell_of(second), Some(GridPos::new(5, 2)));
        assert_eq!(world.store[mailbox].role, filled);
        assert_eq!(world.mail_progress(), (1, 2));
        assert!(!world.room.solved);
    }

    #[test]
    fn restart_does_not_double_count_deliveries() {
        let mut world = sorting_room();
        walk(&mut world, Facing::Right, 3);
        assert_eq!(world.mail_progress(), (1, 2));
        assert_eq!(world.delivered, 0);

        step(&mut world, &[InputIntent::press(IntentKind::Restart)]);
        step(&mut world, &[InputIntent::release(IntentKind::Restart)]);
        step(&mut world, &[]);
        assert_eq!(world.mail_progress(), (0, 2));

        walk(&mut world, Facing::Right, 3);
        assert_eq!(world.mail_progress(), (1, 2));
        assert_eq!(world.delivered, 0);

        walk(&mut world, Facing::Left, 1);
        walk(&mut world, Facing::Down, 2);
        let events = walk(&mut world, Facing::Right, 5);
        assert_eq!(world.player().pos, GridPos::new(9, 4));
        assert!(events.contains(&GameEvent::GameComplete));
        assert_eq!(world.delivered, 2);
    }

    #[test]
    fn held_direction_survives_restart() {
        let text = layout("# Long\n@ spawn 2,2", &[]);
        let mut world = world_of(&[&text]);
        step(&mut world, &[InputIntent::press(IntentKind::Right)]);
        step(&mut world, &[InputIntent::press(IntentKind::Restart)]);
        step(&mut world, &[InputIntent::release(IntentKind::Restart)]);
        assert_eq!(world.player().pos, GridPos::new(5, 2));
        assert_eq!(world.pending, Some(0));

        step(&mut world, &[]);
        assert_eq!(world.player().pos, GridPos::new(2, 2));
        step(&mut world, &[]);
        assert_eq!(world.player().pos, GridPos::new(3, 2));
    }

    #[test]
    fn restart_rebuilds_current_room() {
        let text = layout("# Push\n@ spawn 1,1", &[(1, "#.B................#")]);
        let mut world = world_of(&[&text]);
        walk(&mut world, Facing::Right, 2);
        assert_eq!(pos_of(&world, world.room.children[0]), GridPos::new(4, 1));

        step(&mut world, &[InputIntent::press(IntentKind::Restart)]);
        assert_eq!(world.pending, None);
        step(&mut world, &[InputIntent::release(IntentKind::Restart)]);
        assert_eq!(world.pending, Some(0));
        let events = step(&mut world, &[]);
        assert!(events.contains(&GameEvent::RoomEntered { room: "Push".into() }));
        assert_eq!(pos_of(&world, world.room.children[0]), GridPos::new(2, 1));
        assert_eq!(world.player().pos, GridPos::new(1, 1));
        assert_eq!(world.store.len(), 2);
    }

    #[test]
    fn second_request_while_pending_is_ignored() {
        let mut world = embedded_world();
        transition::request(&mut world, 2);
        transition::request(&mut world, 1);
        assert_eq!(world.pending, Some(2));
        step(&mut world, &[]);
        assert_eq!(world.template().name, "Two Ways");
    }

    #[test]
    fn empty_room_solves_after_first_pass() {
        let a = layout("# A", &[]);
        let b = layout("# B\n> end", &[]);
        let mut world = world_of(&[&a, &b]);
        assert!(!world.room.solved);
        assert_eq!(world.pending, None);

        let events = step(&mut world, &[]);
        assert_eq!(events, vec![GameEvent::RoomSolved { room: "A".into() }]);
        assert_eq!(world.pending, Some(1));

        let events = step(&mut world, &[]);
        assert_eq!(events, vec![
            GameEvent::RoomEntered { room: "B".into() },
            GameEvent::RoomSolved { room: "B".into() },
            GameEvent::GameComplete,
        ]);
    }

    #[test]
    fn render_list_orders_by_depth() {
        let world = embedded_world();
        let items = render_list(&world);
        assert_eq!(items.len(), 3);
        assert!(items.windows(2).all(|w| w[0].depth <= w[1].depth));
        assert_eq!(items.last().map(|i| i.id), Some(world.player));
    }
}
