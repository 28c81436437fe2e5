//! World context and document update transactions
//!
//! The [`World`] replaces ambient singletons: it owns the scene, the grid
//! measure, tokens, regions, combat, users, the observer bus, and the event
//! log, and drives the pre-update/post-update hooks of every token update.
//! Pre-update hooks may mutate the pending change set or veto the movement;
//! post-update hooks run after the change is applied and fire events.

pub mod obstacles;
pub mod token;

pub use obstacles::{GridObstacleConstrainer, ObstacleMap};
pub use token::{TokenChanges, TokenDocument};

use crate::combat::{turn_oracle, Combat, Combatant, CombatantChanges};
use crate::core::config::Settings;
use crate::core::error::{Result, TabletopError};
use crate::core::types::{CombatantId, MovementId, RegionId, TokenId, UserId};
use crate::events::{EventBus, EventLog, LoggedEvent};
use crate::grid::GridMeasure;
use crate::movement::action::ActionRegistry;
use crate::movement::continuation::{
    anonymous_pause_key, ContinuationHandle, PauseGuard, ResumeWaiter,
};
use crate::movement::coordinator::{self, MoveContext, PreUpdateOutcome};
use crate::movement::operation::{ConstrainOptions, MovementMethod, MovementOperation, MovementState};
use crate::movement::splitter::footprint_samples;
use crate::movement::waypoint::{MovementWaypoint, MovementWaypointInput, TokenPosition};
use crate::region::behavior::RegionDocument;
use crate::region::boundary::PathPoint;
use crate::region::events::dispatch_token_region_events;
use crate::scene::Scene;
use ahash::{AHashMap, AHashSet};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Hints for the canvas-facing consumer
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderFlags {
    pub refresh_position: bool,
    pub refresh_ruler: bool,
    pub refresh_rotation: bool,
}

/// The renderable placeable consumer
///
/// The core treats these as opaque side-effecting calls: path constraint
/// against walls, terrain annotation, and render refresh hints.
pub trait PlaceableSink {
    fn constrain_movement_path(
        &self,
        grid: &dyn GridMeasure,
        registry: &ActionRegistry,
        path: &[MovementWaypoint],
        options: &ConstrainOptions,
    ) -> (Vec<MovementWaypoint>, bool);

    fn create_terrain_movement_path(
        &self,
        grid: &dyn GridMeasure,
        path: &[MovementWaypoint],
    ) -> Vec<MovementWaypoint>;

    fn request_refresh(&self, _token: TokenId, _flags: RenderFlags) {}
}

/// Options of one document update
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Suppress no-op updates; movement transactions force this off
    pub diff: bool,
    /// Animate the resulting movement on the canvas
    pub animate: bool,
    pub method: MovementMethod,
    pub auto_rotate: Option<bool>,
    pub show_ruler: Option<bool>,
    pub constrain: ConstrainOptions,
    /// Set when this update continues a prior movement operation
    pub continued_from: Option<MovementId>,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            diff: true,
            animate: true,
            method: MovementMethod::default(),
            auto_rotate: None,
            show_ruler: None,
            constrain: ConstrainOptions::default(),
            continued_from: None,
        }
    }
}

impl UpdateOptions {
    pub fn dragging() -> Self {
        Self {
            method: MovementMethod::Dragging,
            ..Default::default()
        }
    }

    pub fn with_method(method: MovementMethod) -> Self {
        Self {
            method,
            ..Default::default()
        }
    }
}

/// Result of a token update
#[derive(Debug)]
pub struct MoveOutcome {
    /// The committed movement operation, if the update was a movement
    pub movement: Option<Arc<MovementOperation>>,
    /// Post-commit state of that operation
    pub state: Option<MovementState>,
    /// Handle to the queued continuation when pending waypoints remain
    pub continuation: Option<ContinuationHandle>,
    /// The movement was vetoed or fully obstructed
    pub rejected: bool,
}

/// The game world
pub struct World {
    pub scene: Scene,
    pub settings: Settings,
    pub actions: ActionRegistry,
    pub regions: AHashMap<RegionId, RegionDocument>,
    pub combat: Option<Combat>,
    pub obstacles: ObstacleMap,
    pub bus: EventBus,
    pub log: EventLog,
    tokens: AHashMap<TokenId, TokenDocument>,
    grid: Box<dyn GridMeasure>,
    renderer: Option<Box<dyn PlaceableSink>>,
    user: UserId,
    connected: AHashSet<UserId>,
}

impl World {
    pub fn new(scene: Scene) -> Self {
        let grid = scene.build_grid();
        let obstacles = ObstacleMap::new(scene.grid_size);
        let user = UserId::new();
        let mut connected = AHashSet::new();
        connected.insert(user);

        Self {
            scene,
            settings: Settings::default(),
            actions: ActionRegistry::builtin(),
            regions: AHashMap::new(),
            combat: None,
            obstacles,
            bus: EventBus::new(),
            log: EventLog::new(),
            tokens: AHashMap::new(),
            grid,
            renderer: None,
            user,
            connected,
        }
    }

    pub fn grid(&self) -> &dyn GridMeasure {
        self.grid.as_ref()
    }

    /// Install the canvas-facing consumer
    pub fn set_renderer(&mut self, renderer: Box<dyn PlaceableSink>) {
        self.renderer = Some(renderer);
    }

    /// Install the obstacle-map-backed constrainer as renderer
    pub fn install_obstacle_renderer(&mut self) {
        self.renderer = Some(Box::new(GridObstacleConstrainer::new(self.obstacles.clone())));
    }

    // === USERS ===

    pub fn current_user(&self) -> UserId {
        self.user
    }

    pub fn set_current_user(&mut self, user: UserId) {
        self.user = user;
        self.connected.insert(user);
    }

    pub fn connect_user(&mut self, user: UserId) {
        self.connected.insert(user);
    }

    pub fn disconnect_user(&mut self, user: UserId) {
        self.connected.remove(&user);
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.connected.contains(&user)
    }

    // === TOKENS ===

    pub fn token(&self, id: TokenId) -> Result<&TokenDocument> {
        self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))
    }

    pub fn token_ids(&self) -> Vec<TokenId> {
        self.tokens.keys().copied().collect()
    }

    /// Create a token and fire initial region enter events
    pub fn create_token(&mut self, name: impl Into<String>, x: f64, y: f64) -> TokenId {
        self.spawn_token(TokenDocument::new(name, x, y))
    }

    pub fn spawn_token(&mut self, token: TokenDocument) -> TokenId {
        let id = token.id;
        let new_regions = self.regions_containing(&token.position());
        self.tokens.insert(id, token);
        if let Some(token) = self.tokens.get_mut(&id) {
            token.regions = new_regions.clone();
        }
        {
            let Self { regions, bus, log, .. } = self;
            dispatch_token_region_events(
                regions,
                bus,
                log,
                id,
                &AHashSet::new(),
                &new_regions,
                false,
                None,
            );
        }
        id
    }

    /// Delete a token, firing exit events for every region it was in
    pub fn delete_token(&mut self, id: TokenId) -> Result<()> {
        let old_regions = {
            let token = self.tokens.get_mut(&id).ok_or(TabletopError::TokenNotFound(id))?;
            if let Some(op) = &token.movement {
                if !op.state().is_terminal() {
                    op.transition(MovementState::Stopped);
                }
            }
            token.continuation.finish(false);
            token.regions.clone()
        };
        {
            let Self { regions, bus, log, .. } = self;
            dispatch_token_region_events(
                regions,
                bus,
                log,
                id,
                &old_regions,
                &AHashSet::new(),
                false,
                None,
            );
        }
        self.tokens.remove(&id);
        Ok(())
    }

    // === REGIONS ===

    /// Add a region and bring every token's containment up to date
    pub fn add_region(&mut self, region: RegionDocument) -> RegionId {
        let id = region.id;
        self.regions.insert(id, region);
        for token_id in self.token_ids() {
            self.refresh_token_regions(token_id);
        }
        id
    }

    /// Remove a region, firing exit events for its members
    pub fn remove_region(&mut self, id: RegionId) {
        self.regions.remove(&id);
        for token_id in self.token_ids() {
            self.refresh_token_regions(token_id);
        }
    }

    /// Regions containing a token at the given position
    pub fn regions_containing(&self, position: &TokenPosition) -> AHashSet<RegionId> {
        let samples = footprint_samples(self.grid.as_ref(), position);
        let point = PathPoint::new(DVec2::new(position.x, position.y), position.elevation);
        self.regions
            .values()
            .filter(|r| r.boundary.test_samples(&point, &samples))
            .map(|r| r.id)
            .collect()
    }

    fn refresh_token_regions(&mut self, id: TokenId) {
        let Some(token) = self.tokens.get(&id) else {
            return;
        };
        let new_regions = self.regions_containing(&token.position());
        let old_regions = token.regions.clone();
        if old_regions == new_regions {
            return;
        }
        if let Some(token) = self.tokens.get_mut(&id) {
            token.regions = new_regions.clone();
        }
        let Self { regions, bus, log, .. } = self;
        dispatch_token_region_events(
            regions, bus, log, id, &old_regions, &new_regions, false, None,
        );
    }

    // === DOCUMENT UPDATES ===

    /// Update a token through the full pre-update/post-update transaction
    pub fn update_token(
        &mut self,
        id: TokenId,
        mut changes: TokenChanges,
        mut options: UpdateOptions,
    ) -> Result<MoveOutcome> {
        // Pre-update: hooks may mutate the change set or veto the movement
        let outcome = {
            let Self {
                grid,
                settings,
                actions,
                regions,
                renderer,
                bus,
                obstacles,
                combat,
                user,
                tokens,
                ..
            } = self;
            let token = tokens.get_mut(&id).ok_or(TabletopError::TokenNotFound(id))?;
            let ctx = MoveContext {
                grid: grid.as_ref(),
                settings,
                registry: actions,
                regions,
                renderer: renderer.as_deref(),
                bus,
                obstacles,
                combat: combat.as_ref(),
                user: *user,
            };
            coordinator::pre_update_movement(&ctx, token, &mut changes, &mut options)?
        };

        // Apply the change set durably
        let (old_regions, moved) = {
            let token = self.tokens.get_mut(&id).ok_or(TabletopError::TokenNotFound(id))?;
            let old_regions = token.regions.clone();
            changes.apply_to(token);
            if let PreUpdateOutcome::Movement(prepared) = &outcome {
                if !prepared.history_append.is_empty() {
                    token
                        .movement_history
                        .extend(prepared.history_append.iter().cloned());
                    let limit = self.settings.history_limit;
                    if limit > 0 && token.movement_history.len() > limit {
                        let excess = token.movement_history.len() - limit;
                        token.movement_history.drain(..excess);
                    }
                }
            }
            (old_regions, matches!(outcome, PreUpdateOutcome::Movement(_)))
        };

        // Containment recompute: the token's region set always equals the
        // oracle result for its post-update position
        let new_regions = {
            let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
            self.regions_containing(&token.position())
        };
        if let Some(token) = self.tokens.get_mut(&id) {
            token.regions = new_regions.clone();
        }

        // Post-update: movement bookkeeping and events
        let mut state = None;
        let mut movement = None;
        let mut rejected = false;
        match &outcome {
            PreUpdateOutcome::Movement(prepared) => {
                let Self { tokens, bus, log, .. } = self;
                let token = tokens.get_mut(&id).ok_or(TabletopError::TokenNotFound(id))?;
                state = Some(coordinator::post_update_movement(bus, log, token, prepared));
                movement = Some(Arc::clone(&prepared.operation));
            }
            PreUpdateOutcome::Rejected => rejected = true,
            PreUpdateOutcome::NotMovement => {}
        }

        // Region events fire after the transaction commits, never blocking it
        {
            let Self { regions, bus, log, .. } = self;
            dispatch_token_region_events(
                regions,
                bus,
                log,
                id,
                &old_regions,
                &new_regions,
                moved,
                movement.as_ref(),
            );
        }

        // Render hints for the canvas consumer
        if let (Some(renderer), Some(op)) = (&self.renderer, &movement) {
            renderer.request_refresh(
                id,
                RenderFlags {
                    refresh_position: true,
                    refresh_ruler: op.show_ruler(),
                    refresh_rotation: changes.rotation.is_some(),
                },
            );
        }

        // Hand back the queued continuation when more movement awaits and
        // no pause is outstanding
        let continuation = match (&state, &movement) {
            (Some(MovementState::Pending), Some(op)) if !op.pending.waypoints.is_empty() => {
                let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
                if token.continuation.is_paused() {
                    None
                } else {
                    Some(ContinuationHandle::new(op.id, token.continuation.latch()))
                }
            }
            _ => None,
        };

        Ok(MoveOutcome {
            movement,
            state,
            continuation,
            rejected,
        })
    }

    /// Move a token along the given waypoints
    pub fn move_token(
        &mut self,
        id: TokenId,
        waypoints: Vec<MovementWaypointInput>,
        options: UpdateOptions,
    ) -> Result<MoveOutcome> {
        self.update_token(id, TokenChanges::along(waypoints), options)
    }

    /// Issue the follow-up update of a checkpointed movement
    ///
    /// Resolves to `None` when the token's live state no longer matches the
    /// handle's movement id: an expected race with superseding updates, not
    /// an error.
    pub fn continue_movement(
        &mut self,
        id: TokenId,
        handle: &ContinuationHandle,
    ) -> Result<Option<MoveOutcome>> {
        let (inputs, options) = {
            let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
            if token.continuation.movement_id() != Some(handle.movement_id) {
                return Ok(None);
            }
            let Some(op) = token.movement() else {
                return Ok(None);
            };
            if op.id != handle.movement_id || op.state() != MovementState::Pending {
                return Ok(None);
            }

            let inputs: Vec<MovementWaypointInput> = op
                .pending
                .waypoints
                .iter()
                .filter(|w| !w.intermediate)
                .map(MovementWaypointInput::from)
                .collect();
            if inputs.is_empty() {
                return Ok(None);
            }

            let mut options = op.update_options.clone();
            options.diff = true;
            options.method = op.method;
            options.auto_rotate = Some(op.auto_rotate());
            options.show_ruler = Some(op.show_ruler());
            options.constrain = op.constrain_options;
            options.continued_from = Some(op.id);
            (inputs, options)
        };

        self.update_token(id, TokenChanges::along(inputs), options)
            .map(Some)
    }

    /// Move a token and drive every continuation to its end
    pub async fn move_token_to_completion(
        &mut self,
        id: TokenId,
        waypoints: Vec<MovementWaypointInput>,
        options: UpdateOptions,
    ) -> Result<MoveOutcome> {
        let mut outcome = self.move_token(id, waypoints, options)?;
        while let Some(handle) = outcome.continuation.take() {
            if !handle.ready().await {
                break;
            }
            match self.continue_movement(id, &handle)? {
                Some(next) => outcome = next,
                None => break,
            }
        }
        Ok(outcome)
    }

    // === PAUSE / RESUME / STOP ===

    fn live_movement(&self, id: TokenId) -> Result<Arc<MovementOperation>> {
        let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
        let op = token
            .movement
            .clone()
            .ok_or(TabletopError::NoActiveMovement(id))?;
        if op.state().is_terminal() {
            return Err(TabletopError::NoActiveMovement(id));
        }
        Ok(op)
    }

    fn check_initiator(&self, op: &MovementOperation) -> Result<()> {
        if op.user != self.user {
            return Err(TabletopError::MovementPermission {
                user: self.user,
                movement: op.id,
            });
        }
        Ok(())
    }

    fn mark_paused(&mut self, id: TokenId, op: &MovementOperation) {
        if op.state() == MovementState::Pending && op.transition(MovementState::Paused) {
            self.bus.emit_pause(id);
            self.log.add(LoggedEvent::MovementPaused { token: id });
        }
    }

    /// Pause the token's movement; the returned guard releases the hold
    pub fn pause_movement(&mut self, id: TokenId) -> Result<PauseGuard> {
        let op = self.live_movement(id)?;
        self.check_initiator(&op)?;
        let latch = self
            .tokens
            .get(&id)
            .ok_or(TabletopError::TokenNotFound(id))?
            .continuation
            .latch();
        let key = anonymous_pause_key();
        latch.register(&key);
        self.mark_paused(id, &op);
        Ok(PauseGuard::new(latch, key))
    }

    /// Pause under a caller-supplied key; resolves once every key is
    /// released
    pub fn pause_movement_with_key(&mut self, id: TokenId, key: &str) -> Result<ResumeWaiter> {
        let op = self.live_movement(id)?;
        self.check_initiator(&op)?;
        let latch = self
            .tokens
            .get(&id)
            .ok_or(TabletopError::TokenNotFound(id))?
            .continuation
            .latch();
        if !latch.register(key) {
            return Err(TabletopError::DuplicatePauseKey {
                movement: op.id,
                key: key.to_string(),
            });
        }
        self.mark_paused(id, &op);
        Ok(latch.waiter())
    }

    /// Release one pause key; true once the movement is fully resumed
    pub fn resume_movement(&mut self, id: TokenId, movement_id: MovementId, key: &str) -> Result<bool> {
        let (latch, op) = {
            let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
            if token.continuation.movement_id() != Some(movement_id) {
                return Ok(false);
            }
            (token.continuation.latch(), token.movement.clone())
        };
        if !latch.release(key) {
            return Ok(false);
        }
        if !latch.is_paused() {
            if let Some(op) = op {
                op.transition(MovementState::Pending);
            }
            return Ok(true);
        }
        Ok(false)
    }

    /// Stop the token's movement; initiating user only, idempotent
    pub fn stop_movement(&mut self, id: TokenId) -> Result<()> {
        let op = {
            let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
            token.movement.clone()
        };
        let Some(op) = op else {
            return Ok(());
        };
        if op.state().is_terminal() {
            return Ok(());
        }
        self.check_initiator(&op)?;
        self.halt_movement(id)
    }

    /// Force-stop a movement whose initiating user has disconnected
    ///
    /// Any participant may do this locally; no broadcast is needed since
    /// the origin is gone.
    pub fn force_stop_disconnected(&mut self, id: TokenId) -> Result<()> {
        let op = {
            let token = self.tokens.get(&id).ok_or(TabletopError::TokenNotFound(id))?;
            token.movement.clone()
        };
        let Some(op) = op else {
            return Ok(());
        };
        if op.state().is_terminal() {
            return Ok(());
        }
        if self.connected.contains(&op.user) {
            return Err(TabletopError::InitiatorConnected(op.user));
        }
        tracing::warn!(token = ?id, "force-stopping movement of disconnected user");
        self.halt_movement(id)
    }

    fn halt_movement(&mut self, id: TokenId) -> Result<()> {
        {
            let token = self.tokens.get_mut(&id).ok_or(TabletopError::TokenNotFound(id))?;
            if let Some(op) = &token.movement {
                op.transition(MovementState::Stopped);
            }
            token.continuation.finish(false);
        }
        self.bus.emit_stop(id);
        self.log.add(LoggedEvent::MovementStopped { token: id });
        Ok(())
    }

    // === COMBAT ===

    /// Create the combat encounter if none exists
    pub fn start_combat(&mut self) -> &mut Combat {
        self.combat.get_or_insert_with(Combat::new)
    }

    /// End combat and clear all persisted movement history
    pub fn end_combat(&mut self) {
        self.combat = None;
        for token in self.tokens.values_mut() {
            token.clear_movement_history();
        }
    }

    /// Add combatants, preserving whose turn it is
    pub fn add_combatants(&mut self, additions: Vec<Combatant>) {
        let Some(combat) = &mut self.combat else {
            return;
        };
        let update = turn_oracle::simulate_create(combat, &additions);
        combat.combatants.extend(additions);
        if let Some(update) = update {
            combat.turn = Some(update.turn);
            if !update.suppress_turn_events {
                self.log.add(LoggedEvent::TurnChanged {
                    turn: update.turn as u32,
                });
            }
        }
    }

    /// Update combatants, preserving whose turn it is
    pub fn update_combatants(&mut self, changes: &[(CombatantId, CombatantChanges)]) {
        let Some(combat) = &mut self.combat else {
            return;
        };
        let update = turn_oracle::simulate_update(combat, changes);
        for (id, change) in changes {
            if let Some(combatant) = combat.combatant_mut(*id) {
                if let Some(initiative) = change.initiative {
                    combatant.initiative = Some(initiative);
                }
                if let Some(defeated) = change.defeated {
                    combatant.defeated = defeated;
                }
                if let Some(name) = &change.name {
                    combatant.name = name.clone();
                }
            }
        }
        if let Some(update) = update {
            combat.turn = Some(update.turn);
            if !update.suppress_turn_events {
                self.log.add(LoggedEvent::TurnChanged {
                    turn: update.turn as u32,
                });
            }
        }
    }

    /// Delete combatants; the turn passes to the nearest survivor when the
    /// acting combatant is removed
    pub fn delete_combatants(&mut self, deletions: &[CombatantId]) {
        let skip_defeated = self.settings.skip_defeated;
        let Some(combat) = &mut self.combat else {
            return;
        };
        let had_current = combat.current().is_some();
        let update = turn_oracle::simulate_delete(combat, deletions, skip_defeated);
        combat.combatants.retain(|c| !deletions.contains(&c.id));
        match update {
            Some(update) => {
                combat.turn = Some(update.turn);
                if !update.suppress_turn_events {
                    self.log.add(LoggedEvent::TurnChanged {
                        turn: update.turn as u32,
                    });
                }
            }
            None => {
                if had_current {
                    combat.turn = None;
                }
            }
        }
    }

    /// Advance to the next turn, wrapping into a new round
    pub fn next_turn(&mut self) {
        let Some(combat) = &mut self.combat else {
            return;
        };
        if !combat.started || combat.combatants.is_empty() {
            return;
        }
        let next = match combat.turn {
            Some(turn) if turn + 1 < combat.combatants.len() => turn + 1,
            Some(_) => {
                combat.round += 1;
                0
            }
            None => 0,
        };
        combat.turn = Some(next);
        self.log.add(LoggedEvent::TurnChanged { turn: next as u32 });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn world() -> World {
        World::new(Scene::new("test", 4000.0, 3000.0))
    }

    #[test]
    fn test_create_token() {
        let mut w = world();
        let id = w.create_token("goblin", 0.0, 0.0);
        assert_eq!(w.token(id).unwrap().name, "goblin");
    }

    #[test]
    fn test_unknown_token_errors() {
        let w = world();
        assert!(matches!(
            w.token(TokenId::new()),
            Err(TabletopError::TokenNotFound(_))
        ));
    }

    #[test]
    fn test_non_movement_update() {
        let mut w = world();
        let id = w.create_token("goblin", 0.0, 0.0);
        let outcome = w
            .update_token(
                id,
                TokenChanges {
                    name: Some("hobgoblin".into()),
                    ..Default::default()
                },
                UpdateOptions::default(),
            )
            .unwrap();
        assert!(outcome.movement.is_none());
        assert!(!outcome.rejected);
        assert_eq!(w.token(id).unwrap().name, "hobgoblin");
    }

    #[test]
    fn test_simple_move_completes() {
        let mut w = world();
        let id = w.create_token("goblin", 0.0, 0.0);
        let outcome = w
            .move_token(
                id,
                vec![MovementWaypointInput::to(200.0, 0.0)],
                UpdateOptions::default(),
            )
            .unwrap();
        assert_eq!(outcome.state, Some(MovementState::Completed));
        assert_eq!(w.token(id).unwrap().x, 200.0);
    }

    #[test]
    fn test_user_roster() {
        let mut w = world();
        let other = UserId::new();
        w.connect_user(other);
        assert!(w.is_connected(other));
        w.disconnect_user(other);
        assert!(!w.is_connected(other));
    }
}
