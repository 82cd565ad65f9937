mod context;
mod tables;

use glam::Vec2;

use crate::net::packets::{
    AllPositionUpdate, CONNECT_CODE_ACCEPTED, Chat, FloorMove, GAME_TEAM1_WIN, GAME_TEAM2_WIN,
    GameStatus, MAX_PLAYERS, ObjectiveStatus, Payload, PlayerConnect,
};
use crate::net::{Fetch, NetError, Packet, PacketError, PacketType};
use crate::world::{CollisionKind, ComponentMask, Direction, EntityId, Team, World};

pub use context::{
    AnimationLoader, Appearance, ChatHistory, ChatLog, FloorBuilder, UpdateContext,
};
pub use tables::{ObjectiveEntry, ObjectiveTable, PlayerTable};

/// Where newly announced remote players appear until their first position update.
pub const DEFAULT_SPAWN: Vec2 = Vec2::new(400.0, 600.0);

/// What one `apply` call did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub applied: usize,
    pub skipped: usize,
    /// Per-slot position entries dropped as older than what was already applied.
    pub stale: usize,
    /// Set when the server reported a team victory.
    pub game_over: Option<Team>,
    pub shutdown: Option<String>,
    /// Player number granted by an accepted connection.
    pub connected: Option<u32>,
}

/// Applies fetched server packets to the client world.
///
/// Owns the player and objective tables; everything else it touches comes
/// in through [`UpdateContext`] and is only used on the gameplay thread.
#[derive(Debug, Clone)]
pub struct ClientUpdateSystem {
    players: PlayerTable,
    objectives: ObjectiveTable,
    local_team: Team,
    floor_transition: bool,
}

impl Default for ClientUpdateSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientUpdateSystem {
    pub fn new() -> Self {
        Self {
            players: PlayerTable::default(),
            objectives: ObjectiveTable::default(),
            local_team: Team::None,
            floor_transition: false,
        }
    }

    pub fn players(&self) -> &PlayerTable {
        &self.players
    }

    pub fn objectives(&self) -> &ObjectiveTable {
        &self.objectives
    }

    pub fn local_team(&self) -> Team {
        self.local_team
    }

    pub fn local_slot(&self) -> Option<usize> {
        self.players.local_slot()
    }

    /// Marks a player-initiated floor change as in flight.
    ///
    /// Until the server answers with a floor move, every other packet is skipped.
    pub fn begin_floor_transition(&mut self) {
        self.floor_transition = true;
    }

    pub fn is_floor_transition_pending(&self) -> bool {
        self.floor_transition
    }

    pub fn reset(&mut self) {
        self.players.clear();
        self.objectives.clear();
        self.local_team = Team::None;
        self.floor_transition = false;
    }

    /// Applies one fetch result.
    ///
    /// A denied connection is the only error; it aborts the rest of the batch.
    pub fn apply(
        &mut self,
        fetch: Fetch,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<TickOutcome, NetError> {
        match fetch {
            Fetch::Packets(packets) => self.apply_packets(&packets, ctx),
            Fetch::Shutdown { reason } => {
                log::info!("Clearing network state: {}", reason);
                self.reset();
                Ok(TickOutcome {
                    shutdown: Some(reason),
                    ..TickOutcome::default()
                })
            }
            Fetch::NotConnected => Ok(TickOutcome::default()),
        }
    }

    pub fn apply_packets(
        &mut self,
        packets: &[Packet],
        ctx: &mut UpdateContext<'_>,
    ) -> Result<TickOutcome, NetError> {
        let mut outcome = TickOutcome::default();

        for packet in packets {
            if self.floor_transition && packet.kind != PacketType::FloorMove {
                log::trace!("Skipping {:?} during floor transition", packet.kind);
                outcome.skipped += 1;
                continue;
            }

            match self.dispatch(packet, ctx, &mut outcome) {
                Ok(true) => outcome.applied += 1,
                Ok(false) => outcome.skipped += 1,
                Err(NetError::ConnectionDenied) => {
                    log::error!("Server denied the connection");
                    return Err(NetError::ConnectionDenied);
                }
                Err(e) => {
                    log::warn!("Skipping {:?}: {}", packet.kind, e);
                    outcome.skipped += 1;
                }
            }
        }

        Ok(outcome)
    }

    fn dispatch(
        &mut self,
        packet: &Packet,
        ctx: &mut UpdateContext<'_>,
        outcome: &mut TickOutcome,
    ) -> Result<bool, NetError> {
        match packet.kind {
            PacketType::PlayerConnect => self.on_connect(&read(packet)?, ctx, outcome),
            PacketType::GameStatus => self.on_status(&read(packet)?, ctx),
            PacketType::AllPositionUpdate => {
                self.on_positions(&read(packet)?, packet.timestamp, ctx, outcome)
            }
            PacketType::ObjectiveStatus => self.on_objectives(&read(packet)?, ctx, outcome),
            PacketType::Chat => self.on_chat(&read(packet)?, ctx),
            PacketType::FloorMove => self.on_floor_move(&read(packet)?, ctx),
            kind => {
                log::trace!("Ignoring {:?}", kind);
                Ok(false)
            }
        }
    }

    fn local_entity(&self, world: &World) -> Option<EntityId> {
        self.players
            .local_entity()
            .filter(|&id| world.contains(id))
            .or_else(|| world.controllable())
    }

    fn local_level(&self, world: &World) -> Option<u32> {
        self.local_entity(world)
            .and_then(|id| world.get(id))
            .map(|e| e.position.level)
    }

    fn on_connect(
        &mut self,
        msg: &PlayerConnect,
        ctx: &mut UpdateContext<'_>,
        outcome: &mut TickOutcome,
    ) -> Result<bool, NetError> {
        if msg.connect_code != CONNECT_CODE_ACCEPTED {
            return Err(NetError::ConnectionDenied);
        }
        let slot = slot_index("player_number", msg.player_number)?;

        let local = match ctx.world.controllable() {
            Some(id) => id,
            None => ctx.world.spawn_controllable(DEFAULT_SPAWN, 1),
        };

        // A status packet may have announced our own slot before the connect reply.
        if let Some(previous) = self.players.get(slot).filter(|&id| id != local) {
            ctx.world.despawn(previous);
        }

        let team = Team::from_wire(msg.team);
        if let Some(entity) = ctx.world.get_mut(local) {
            entity.player.team = team;
            entity.player.number = msg.player_number;
            entity.collision = CollisionKind::for_team(team);
        }

        self.local_team = team;
        self.players.set_local(slot, local);
        outcome.connected = Some(msg.player_number);

        log::info!("Joined as player {} ({:?})", msg.player_number, team);
        Ok(true)
    }

    fn on_status(
        &mut self,
        msg: &GameStatus,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<bool, NetError> {
        let level = self.local_level(ctx.world).unwrap_or(1);

        for slot in 0..MAX_PLAYERS {
            if self.players.is_local(slot) {
                continue;
            }

            let valid = msg.player_valid[slot] != 0;
            let team = Team::from_wire(u32::from(msg.teams[slot]));
            let character = msg.characters[slot];

            match (valid, self.players.get(slot)) {
                (false, Some(id)) => {
                    self.players.unassign(slot);
                    ctx.world.despawn(id);
                    log::debug!("Player {} left", slot);
                }
                (true, None) => {
                    let id = ctx.world.spawn_player(DEFAULT_SPAWN, level);
                    if let Some(entity) = ctx.world.get_mut(id) {
                        entity.player.team = team;
                        entity.player.number = slot as u32;
                        entity.player.ready = msg.ready[slot] != 0;
                        entity.player.character = character;
                        entity.collision = CollisionKind::for_team(team);
                    }
                    ctx.animations
                        .load(ctx.world, id, Appearance::for_player(team, character));
                    self.players.assign(slot, id);
                    log::debug!("Player {} joined ({:?})", slot, team);
                }
                (true, Some(id)) => {
                    if let Some(entity) = ctx.world.get_mut(id) {
                        entity.player.team = team;
                        entity.player.number = slot as u32;
                        entity.player.ready = msg.ready[slot] != 0;
                        entity.collision = CollisionKind::for_team(team);
                    }
                }
                (false, None) => {}
            }
        }

        Ok(true)
    }

    fn on_positions(
        &mut self,
        msg: &AllPositionUpdate,
        timestamp: u64,
        ctx: &mut UpdateContext<'_>,
        outcome: &mut TickOutcome,
    ) -> Result<bool, NetError> {
        if self.local_level(ctx.world) != Some(msg.floor) {
            return Ok(false);
        }

        let remote: Vec<(usize, EntityId)> = self
            .players
            .assigned()
            .filter(|&(slot, _)| !self.players.is_local(slot))
            .collect();

        for (slot, id) in remote {
            if !self.players.accept_position(slot, timestamp) {
                outcome.stale += 1;
                continue;
            }
            let Some(entity) = ctx.world.get_mut(id) else {
                continue;
            };

            if msg.on_floor[slot] == 0 {
                entity.mask.remove(ComponentMask::VISIBLE);
                continue;
            }

            let velocity = Vec2::new(msg.vel_x[slot], msg.vel_y[slot]);
            entity.mask.insert(ComponentMask::VISIBLE);
            entity.movement.velocity = velocity;
            entity.movement.last_direction =
                Direction::from_velocity(velocity, entity.movement.last_direction);
            entity.position.pos = Vec2::new(msg.x[slot], msg.y[slot]);
            entity.position.level = msg.floor;
        }

        Ok(true)
    }

    fn on_objectives(
        &mut self,
        msg: &ObjectiveStatus,
        ctx: &mut UpdateContext<'_>,
        outcome: &mut TickOutcome,
    ) -> Result<bool, NetError> {
        self.objectives.mirror(&msg.captured);

        if let Some(level) = self.local_level(ctx.world) {
            for entry in self.objectives.floor(level) {
                if let Some(entity) = entry.entity.and_then(|id| ctx.world.get_mut(id)) {
                    entity.objective.status = entry.state;
                }
            }
        }

        if matches!(msg.game_status, GAME_TEAM1_WIN | GAME_TEAM2_WIN) {
            let winner = Team::from_wire(msg.game_status);
            log::info!("Game over, {:?} won", winner);
            outcome.game_over = Some(winner);
            self.local_team = Team::None;
        }

        Ok(true)
    }

    fn on_chat(&mut self, msg: &Chat, ctx: &mut UpdateContext<'_>) -> Result<bool, NetError> {
        ctx.chat.add_line(&msg.text());
        Ok(true)
    }

    fn on_floor_move(
        &mut self,
        msg: &FloorMove,
        ctx: &mut UpdateContext<'_>,
    ) -> Result<bool, NetError> {
        let range = ObjectiveTable::floor_range(msg.new_floor).ok_or(
            NetError::ProtocolCorruption(PacketError::OutOfRange {
                field: "floor",
                index: msg.new_floor,
            }),
        )?;

        if let Some(previous) = self.local_level(ctx.world) {
            self.objectives.unbind_floor(previous);
        }
        match self.local_entity(ctx.world).and_then(|id| ctx.world.get_mut(id)) {
            Some(entity) => {
                entity.position.level = msg.new_floor;
                entity.position.pos = Vec2::new(msg.x, msg.y);
            }
            None => log::warn!("Floor move to {} with no local player", msg.new_floor),
        }

        ctx.floors.rebuild(ctx.world, msg.new_floor);

        let rebuilt: Vec<EntityId> = ctx.world.objectives_on(msg.new_floor).collect();
        for (index, id) in range.zip(rebuilt) {
            self.objectives.bind(index, id);
            if let (Some(entry), Some(entity)) = (self.objectives.get(index), ctx.world.get_mut(id))
            {
                entity.objective.status = entry.state;
            }
        }

        self.floor_transition = false;
        log::debug!("Moved to floor {}", msg.new_floor);
        Ok(true)
    }
}

fn read<T: Payload>(packet: &Packet) -> Result<T, NetError> {
    packet.read().map_err(NetError::ProtocolCorruption)
}

fn slot_index(field: &'static str, index: u32) -> Result<usize, NetError> {
    match usize::try_from(index) {
        Ok(slot) if slot < MAX_PLAYERS => Ok(slot),
        _ => Err(NetError::ProtocolCorruption(PacketError::OutOfRange {
            field,
            index,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::packets::{
        CONNECT_CODE_DENIED, GAME_IN_PROGRESS, MAX_OBJECTIVES, OBJECTIVES_PER_FLOOR,
    };

    #[derive(Default)]
    struct RecordingAnimations {
        loaded: Vec<(EntityId, Appearance)>,
    }

    impl AnimationLoader for RecordingAnimations {
        fn load(&mut self, _world: &mut World, entity: EntityId, appearance: Appearance) {
            self.loaded.push((entity, appearance));
        }
    }

    #[derive(Default)]
    struct GridFloors {
        rebuilt: Vec<u32>,
    }

    impl FloorBuilder for GridFloors {
        fn rebuild(&mut self, world: &mut World, floor: u32) {
            let old: Vec<EntityId> = world.objectives().collect();
            for id in old {
                world.despawn(id);
            }
            for i in 0..OBJECTIVES_PER_FLOOR {
                world.spawn_objective(Vec2::new(i as f32 * 32.0, 0.0), floor);
            }
            self.rebuilt.push(floor);
        }
    }

    struct Harness {
        world: World,
        animations: RecordingAnimations,
        chat: ChatHistory,
        floors: GridFloors,
        system: ClientUpdateSystem,
        local: EntityId,
    }

    impl Harness {
        fn new() -> Self {
            let mut world = World::new();
            let local = world.spawn_controllable(Vec2::new(10.0, 10.0), 1);
            Self {
                world,
                animations: RecordingAnimations::default(),
                chat: ChatHistory::default(),
                floors: GridFloors::default(),
                system: ClientUpdateSystem::new(),
                local,
            }
        }

        fn connected(slot: u32) -> Self {
            let mut harness = Self::new();
            harness
                .apply(vec![connect(CONNECT_CODE_ACCEPTED, slot, 2)])
                .unwrap();
            harness
        }

        fn fetch(&mut self, fetch: Fetch) -> Result<TickOutcome, NetError> {
            let mut ctx = UpdateContext {
                world: &mut self.world,
                animations: &mut self.animations,
                chat: &mut self.chat,
                floors: &mut self.floors,
            };
            self.system.apply(fetch, &mut ctx)
        }

        fn apply(&mut self, packets: Vec<Packet>) -> Result<TickOutcome, NetError> {
            self.fetch(Fetch::Packets(packets))
        }
    }

    fn connect(code: u32, player_number: u32, team: u32) -> Packet {
        let msg = PlayerConnect {
            connect_code: code,
            player_number,
            team,
        };
        Packet::from_payload(PacketType::PlayerConnect, &msg, 0)
    }

    fn status(valid: &[usize], team: u8) -> Packet {
        let mut msg = GameStatus {
            player_valid: [0; MAX_PLAYERS],
            ready: [0; MAX_PLAYERS],
            teams: [0; MAX_PLAYERS],
            characters: [0; MAX_PLAYERS],
        };
        for &slot in valid {
            msg.player_valid[slot] = 1;
            msg.teams[slot] = team;
            msg.characters[slot] = 3;
        }
        Packet::from_payload(PacketType::GameStatus, &msg, 0)
    }

    fn positions(floor: u32, slot: usize, on_floor: bool, timestamp: u64) -> Packet {
        let mut msg = AllPositionUpdate {
            floor,
            on_floor: [0; MAX_PLAYERS],
            x: [0.0; MAX_PLAYERS],
            y: [0.0; MAX_PLAYERS],
            vel_x: [0.0; MAX_PLAYERS],
            vel_y: [0.0; MAX_PLAYERS],
        };
        msg.on_floor[slot] = u8::from(on_floor);
        msg.x[slot] = 120.0;
        msg.y[slot] = 80.0;
        msg.vel_x[slot] = -2.0;
        msg.vel_y[slot] = 0.0;
        Packet::from_payload(PacketType::AllPositionUpdate, &msg, timestamp)
    }

    fn objective_status(prefix: &[u8], game_status: u32) -> Packet {
        let mut msg = ObjectiveStatus {
            captured: [0; MAX_OBJECTIVES],
            game_status,
        };
        msg.captured[..prefix.len()].copy_from_slice(prefix);
        Packet::from_payload(PacketType::ObjectiveStatus, &msg, 0)
    }

    fn floor_move(floor: u32) -> Packet {
        let msg = FloorMove {
            new_floor: floor,
            x: 64.0,
            y: 96.0,
        };
        Packet::from_payload(PacketType::FloorMove, &msg, 0)
    }

    fn chat(text: &str) -> Packet {
        Packet::from_payload(PacketType::Chat, &Chat::new(1, text), 0)
    }

    #[test]
    fn test_accepted_connect_sets_local_slot() {
        let mut h = Harness::new();
        let outcome = h.apply(vec![connect(CONNECT_CODE_ACCEPTED, 4, 1)]).unwrap();

        assert_eq!(outcome.connected, Some(4));
        assert_eq!(h.system.local_slot(), Some(4));
        assert_eq!(h.system.players().get(4), Some(h.local));
        assert_eq!(h.system.local_team(), Team::Guards);

        let local = h.world.get(h.local).unwrap();
        assert_eq!(local.player.number, 4);
        assert_eq!(local.collision, CollisionKind::Guard);
    }

    #[test]
    fn test_reconnect_to_new_slot_keeps_local_player() {
        let mut h = Harness::connected(0);
        h.apply(vec![connect(CONNECT_CODE_ACCEPTED, 3, 2)]).unwrap();

        assert_eq!(h.system.local_slot(), Some(3));
        assert_eq!(h.system.players().get(0), None);
        assert_eq!(h.system.players().get(3), Some(h.local));

        h.apply(vec![status(&[], 0)]).unwrap();
        assert!(h.world.contains(h.local));
        assert_eq!(h.system.players().get(3), Some(h.local));
    }

    #[test]
    fn test_denied_connect_aborts_batch() {
        let mut h = Harness::new();
        let result = h.apply(vec![
            chat("before"),
            connect(CONNECT_CODE_DENIED, 0, 0),
            chat("after"),
        ]);

        assert!(matches!(result, Err(NetError::ConnectionDenied)));
        assert_eq!(h.chat.lines().collect::<Vec<_>>(), vec!["before"]);
        assert_eq!(h.system.local_slot(), None);
    }

    #[test]
    fn test_out_of_range_player_number_is_skipped() {
        let mut h = Harness::new();
        let outcome = h
            .apply(vec![connect(CONNECT_CODE_ACCEPTED, 400, 1)])
            .unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.connected, None);
        assert_eq!(h.system.local_slot(), None);
    }

    #[test]
    fn test_status_spawns_player_once() {
        let mut h = Harness::connected(0);
        let before = h.world.entity_count();

        h.apply(vec![status(&[0, 5], 2)]).unwrap();
        let id = h.system.players().get(5).unwrap();
        assert_eq!(h.world.entity_count(), before + 1);
        assert_eq!(h.world.get(id).unwrap().position.pos, DEFAULT_SPAWN);
        assert_eq!(h.animations.loaded, vec![(id, Appearance::Character(3))]);

        h.apply(vec![status(&[0, 5], 2)]).unwrap();
        assert_eq!(h.system.players().get(5), Some(id));
        assert_eq!(h.world.entity_count(), before + 1);
        assert_eq!(h.animations.loaded.len(), 1);
    }

    #[test]
    fn test_status_updates_team_without_respawn() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[7], 2)]).unwrap();
        let id = h.system.players().get(7).unwrap();

        h.apply(vec![status(&[7], 1)]).unwrap();
        let entity = h.world.get(id).unwrap();
        assert_eq!(entity.player.team, Team::Guards);
        assert_eq!(entity.collision, CollisionKind::Guard);
        assert_eq!(h.animations.loaded.len(), 1);
    }

    #[test]
    fn test_guard_gets_guard_appearance() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[2], 1)]).unwrap();
        let id = h.system.players().get(2).unwrap();
        assert_eq!(h.animations.loaded, vec![(id, Appearance::Guard)]);
    }

    #[test]
    fn test_status_invalid_slot_despawns() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[6], 2)]).unwrap();
        let id = h.system.players().get(6).unwrap();

        h.apply(vec![status(&[], 2)]).unwrap();
        assert!(!h.world.contains(id));
        assert!(!h.system.players().is_assigned(6));
    }

    #[test]
    fn test_status_never_touches_local_slot() {
        let mut h = Harness::connected(3);
        h.apply(vec![status(&[], 0)]).unwrap();

        assert_eq!(h.system.players().get(3), Some(h.local));
        assert!(h.world.contains(h.local));
    }

    #[test]
    fn test_off_floor_player_is_hidden_not_destroyed() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[1], 2)]).unwrap();
        let id = h.system.players().get(1).unwrap();

        h.apply(vec![positions(1, 1, false, 10)]).unwrap();
        let entity = h.world.get(id).unwrap();
        assert!(!entity.is_visible());
        assert_eq!(h.system.players().get(1), Some(id));
    }

    #[test]
    fn test_on_floor_update_moves_player() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[1], 2)]).unwrap();
        let id = h.system.players().get(1).unwrap();
        h.apply(vec![positions(1, 1, false, 10)]).unwrap();

        h.apply(vec![positions(1, 1, true, 11)]).unwrap();
        let entity = h.world.get(id).unwrap();
        assert!(entity.is_visible());
        assert_eq!(entity.position.pos, Vec2::new(120.0, 80.0));
        assert_eq!(entity.position.level, 1);
        assert_eq!(entity.movement.velocity, Vec2::new(-2.0, 0.0));
        assert_eq!(entity.movement.last_direction, Direction::Left);
    }

    #[test]
    fn test_stale_position_is_rejected() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[1], 2)]).unwrap();
        let id = h.system.players().get(1).unwrap();

        h.apply(vec![positions(1, 1, true, 20)]).unwrap();
        let outcome = h.apply(vec![positions(1, 1, false, 19)]).unwrap();

        assert_eq!(outcome.stale, 1);
        assert!(h.world.get(id).unwrap().is_visible());
    }

    #[test]
    fn test_other_floor_positions_ignored() {
        let mut h = Harness::connected(0);
        h.apply(vec![status(&[1], 2)]).unwrap();
        let id = h.system.players().get(1).unwrap();

        let outcome = h.apply(vec![positions(3, 1, true, 5)]).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(h.world.get(id).unwrap().position.pos, DEFAULT_SPAWN);
    }

    #[test]
    fn test_local_player_position_is_authoritative() {
        let mut h = Harness::connected(0);
        h.apply(vec![positions(1, 0, true, 5)]).unwrap();
        assert_eq!(
            h.world.get(h.local).unwrap().position.pos,
            Vec2::new(10.0, 10.0)
        );
    }

    #[test]
    fn test_objective_mirror_stops_at_marker() {
        let mut h = Harness::connected(0);
        h.apply(vec![objective_status(&[1, 1, 1, 1], GAME_IN_PROGRESS)])
            .unwrap();
        h.apply(vec![objective_status(&[2, 2, 0, 2], GAME_IN_PROGRESS)])
            .unwrap();

        let states: Vec<u8> = (0..4)
            .map(|i| h.system.objectives().get(i).unwrap().state)
            .collect();
        assert_eq!(states, vec![2, 2, 1, 1]);
    }

    #[test]
    fn test_victory_resets_local_team() {
        let mut h = Harness::connected(0);
        assert_eq!(h.system.local_team(), Team::Hackers);

        let outcome = h
            .apply(vec![objective_status(&[1], GAME_TEAM2_WIN)])
            .unwrap();
        assert_eq!(outcome.game_over, Some(Team::Hackers));
        assert_eq!(h.system.local_team(), Team::None);
    }

    #[test]
    fn test_floor_move_reseeds_objectives() {
        let mut h = Harness::connected(0);
        let mut captured = [0u8; 2 * OBJECTIVES_PER_FLOOR];
        captured.fill(1);
        captured[OBJECTIVES_PER_FLOOR + 2] = 3;
        h.apply(vec![objective_status(&captured, GAME_IN_PROGRESS)])
            .unwrap();

        h.apply(vec![floor_move(2)]).unwrap();

        let local = h.world.get(h.local).unwrap();
        assert_eq!(local.position.level, 2);
        assert_eq!(local.position.pos, Vec2::new(64.0, 96.0));
        assert_eq!(h.floors.rebuilt, vec![2]);

        let on_floor: Vec<EntityId> = h.world.objectives_on(2).collect();
        let range = ObjectiveTable::floor_range(2).unwrap();
        for (index, id) in range.zip(&on_floor) {
            assert_eq!(h.system.objectives().get(index).unwrap().entity, Some(*id));
        }
        let third = h.world.get(on_floor[2]).unwrap();
        assert_eq!(third.objective.status, 3);
        assert!(h.system.objectives().floor(1).iter().all(|e| e.entity.is_none()));
    }

    #[test]
    fn test_floor_move_out_of_range_is_skipped() {
        let mut h = Harness::connected(0);
        let outcome = h.apply(vec![floor_move(9)]).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert!(h.floors.rebuilt.is_empty());
        assert_eq!(h.world.get(h.local).unwrap().position.level, 1);
    }

    #[test]
    fn test_floor_transition_only_applies_floor_move() {
        let mut h = Harness::connected(0);
        h.system.begin_floor_transition();

        let outcome = h
            .apply(vec![chat("ignored"), floor_move(3), chat("seen")])
            .unwrap();

        assert!(!h.system.is_floor_transition_pending());
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.applied, 2);
        assert_eq!(h.chat.lines().collect::<Vec<_>>(), vec!["seen"]);
    }

    #[test]
    fn test_chat_is_forwarded_trimmed() {
        let mut h = Harness::new();
        h.apply(vec![chat("hello")]).unwrap();
        assert_eq!(h.chat.last(), Some("hello"));
    }

    #[test]
    fn test_unhandled_types_are_ignored() {
        let mut h = Harness::new();
        let packets = vec![
            Packet::new(PacketType::Reserved, Vec::new(), 0),
            Packet::new(PacketType::ClientLobby, vec![0; 12], 1),
        ];
        let outcome = h.apply(packets).unwrap();
        assert_eq!(outcome.skipped, 2);
        assert_eq!(outcome.applied, 0);
    }

    #[test]
    fn test_malformed_payload_is_skipped() {
        let mut h = Harness::new();
        let packets = vec![
            Packet::new(PacketType::GameStatus, vec![1; 5], 0),
            chat("still here"),
        ];
        let outcome = h.apply(packets).unwrap();
        assert_eq!(outcome.skipped, 1);
        assert_eq!(h.chat.last(), Some("still here"));
    }

    #[test]
    fn test_shutdown_clears_tables() {
        let mut h = Harness::connected(0);
        h.apply(vec![
            status(&[1, 2], 2),
            objective_status(&[1, 1], GAME_IN_PROGRESS),
        ])
        .unwrap();

        let outcome = h
            .fetch(Fetch::Shutdown {
                reason: "connection reset".to_string(),
            })
            .unwrap();

        assert_eq!(outcome.shutdown.as_deref(), Some("connection reset"));
        assert_eq!(h.system.players().assigned().count(), 0);
        assert_eq!(h.system.local_slot(), None);
        assert_eq!(h.system.local_team(), Team::None);
        assert!((0..MAX_OBJECTIVES).all(|i| {
            h.system.objectives().get(i) == Some(&ObjectiveEntry::default())
        }));
    }

    #[test]
    fn test_not_connected_is_a_no_op() {
        let mut h = Harness::new();
        assert_eq!(h.fetch(Fetch::NotConnected).unwrap(), TickOutcome::default());
    }
}
