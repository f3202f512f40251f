//! Per-index slot bookkeeping
//!
//! Slots are sparse: an index with no slot is Unloaded and costs nothing.
//! A slot moves Pending -> Resident -> Evicting and is removed once its
//! handle has been released.

use std::collections::BTreeMap;

use crate::backend::{AssetBackend, LoadTicket};
use crate::handle::AssetHandle;

/// Load state of a tracked index
#[derive(Debug)]
pub(crate) enum SlotState<A> {
    /// Load issued, waiting for the backend
    Pending(LoadTicket),

    /// Asset loaded and owned by this slot
    Resident(AssetHandle<A>),

    /// Handle is being returned to the backend
    Evicting,
}

/// What the renderer should draw for an index
#[derive(Debug)]
pub enum AssetState<'a, A> {
    /// Draw the asset
    Resident(&'a AssetHandle<A>),

    /// Draw a placeholder
    Pending,

    /// Nothing requested for this index
    Unloaded,
}

impl<A> AssetState<'_, A> {
    pub fn is_resident(&self) -> bool {
        matches!(self, AssetState::Resident(_))
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AssetState::Pending)
    }

    pub fn is_unloaded(&self) -> bool {
        matches!(self, AssetState::Unloaded)
    }
}

/// What happened when a slot was evicted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Eviction {
    /// A resident handle was released to the backend
    Released,

    /// A pending load was abandoned; its completion will be discarded
    Abandoned,
}

/// Sparse slot storage keyed by item index
#[derive(Debug)]
pub(crate) struct SlotTable<A> {
    slots: BTreeMap<usize, SlotState<A>>,
}

impl<A> SlotTable<A> {
    pub(crate) fn new() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }

    /// Renderer view of `index`
    pub(crate) fn state(&self, index: usize) -> AssetState<'_, A> {
        match self.slots.get(&index) {
            Some(SlotState::Resident(handle)) => AssetState::Resident(handle),
            Some(SlotState::Pending(_)) => AssetState::Pending,
            Some(SlotState::Evicting) | None => AssetState::Unloaded,
        }
    }

    pub(crate) fn contains(&self, index: usize) -> bool {
        self.slots.contains_key(&index)
    }

    /// Ticket of the pending load at `index`, if any
    pub(crate) fn pending_ticket(&self, index: usize) -> Option<LoadTicket> {
        match self.slots.get(&index) {
            Some(SlotState::Pending(ticket)) => Some(*ticket),
            _ => None,
        }
    }

    /// Unloaded -> Pending
    pub(crate) fn begin_load(&mut self, ticket: LoadTicket) {
        let previous = self.slots.insert(ticket.index, SlotState::Pending(ticket));
        debug_assert!(previous.is_none(), "slot {} loaded twice", ticket.index);
    }

    /// Pending -> Resident. Hands the asset back if the slot is not waiting
    /// for this exact ticket.
    pub(crate) fn finish_load(&mut self, ticket: LoadTicket, asset: A) -> Result<(), A> {
        if self.pending_ticket(ticket.index) != Some(ticket) {
            return Err(asset);
        }
        self.slots
            .insert(ticket.index, SlotState::Resident(AssetHandle::new(asset)));
        Ok(())
    }

    /// Pending -> Unloaded after a failed load
    pub(crate) fn abort_load(&mut self, ticket: LoadTicket) -> bool {
        if self.pending_ticket(ticket.index) == Some(ticket) {
            self.slots.remove(&ticket.index);
            true
        } else {
            false
        }
    }

    /// Evict the slot at `index`, releasing its handle exactly once
    pub(crate) fn evict<B>(&mut self, index: usize, backend: &mut B) -> Option<Eviction>
    where
        B: AssetBackend<Asset = A> + ?Sized,
    {
        let state = self.slots.get_mut(&index)?;
        let eviction = match std::mem::replace(state, SlotState::Evicting) {
            SlotState::Resident(handle) => {
                handle.release(backend);
                Eviction::Released
            }
            SlotState::Pending(_) | SlotState::Evicting => Eviction::Abandoned,
        };
        self.slots.remove(&index);
        Some(eviction)
    }

    /// Indices with a slot, ascending
    pub(crate) fn indices(&self) -> Vec<usize> {
        self.slots.keys().copied().collect()
    }

    /// Resident indices, ascending
    pub(crate) fn resident_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .filter(|(_, state)| matches!(state, SlotState::Resident(_)))
            .map(|(index, _)| *index)
            .collect()
    }

    /// Resident + Pending slot count
    pub(crate) fn live(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn pending(&self) -> usize {
        self.slots
            .values()
            .filter(|state| matches!(state, SlotState::Pending(_)))
            .count()
    }

    pub(crate) fn resident(&self) -> usize {
        self.live() - self.pending()
    }
}
