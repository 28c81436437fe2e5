//! Combat encounter and turn tracking

pub mod turn_oracle;

pub use turn_oracle::{
    simulate_create, simulate_delete, simulate_update, CombatantChanges, TurnUpdate,
};

use crate::core::types::{CombatantId, TokenId};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// One participant of a combat encounter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub token: Option<TokenId>,
    pub name: String,
    pub initiative: Option<f64>,
    pub defeated: bool,
}

impl Combatant {
    pub fn new(name: impl Into<String>, token: Option<TokenId>) -> Self {
        Self {
            id: CombatantId::new(),
            token,
            name: name.into(),
            initiative: None,
            defeated: false,
        }
    }

    pub fn with_initiative(mut self, initiative: f64) -> Self {
        self.initiative = Some(initiative);
        self
    }
}

/// A combat encounter
///
/// `turn` indexes into the sorted turn order, not the combatant list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Combat {
    pub combatants: Vec<Combatant>,
    pub turn: Option<usize>,
    pub round: u32,
    pub started: bool,
}

impl Combat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin the encounter on the first turn of round one
    pub fn begin(&mut self) {
        self.started = true;
        self.round = 1;
        if !self.combatants.is_empty() {
            self.turn = Some(0);
        }
    }

    /// Turn order: initiative descending, unrolled initiative last, ties
    /// broken by combatant id
    pub fn turn_order(&self) -> Vec<&Combatant> {
        let mut order: Vec<&Combatant> = self.combatants.iter().collect();
        order.sort_by_key(|c| {
            (
                std::cmp::Reverse(c.initiative.map(OrderedFloat)),
                c.id,
            )
        });
        order
    }

    /// The combatant whose turn it currently is
    pub fn current(&self) -> Option<&Combatant> {
        let turn = self.turn?;
        self.turn_order().into_iter().nth(turn)
    }

    pub fn contains_token(&self, token: TokenId) -> bool {
        self.combatants.iter().any(|c| c.token == Some(token))
    }

    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == id)
    }

    pub fn combatant_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.iter_mut().find(|c| c.id == id)
    }
}
