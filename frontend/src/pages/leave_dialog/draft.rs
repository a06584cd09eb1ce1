use std::rc::Rc;

use super::registry::LeaveVariantRegistry;
use super::types::{DialogError, FieldMap, FieldValue, LeaveDraft, LeaveTypeId};

/// What a subscriber is told after the store changed.
#[derive(Debug, Clone, Copy)]
pub enum DraftEvent<'a> {
    Seeded(&'a LeaveDraft),
    Updated { draft: &'a LeaveDraft, field: &'a str },
    Cleared { generation: u64 },
}

impl<'a> DraftEvent<'a> {
    pub fn draft(&self) -> Option<&'a LeaveDraft> {
        match *self {
            DraftEvent::Seeded(draft) | DraftEvent::Updated { draft, .. } => Some(draft),
            DraftEvent::Cleared { .. } => None,
        }
    }
}

pub type DraftSubscriber = Rc<dyn Fn(DraftEvent<'_>)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Holds the in-progress draft of one open dialog.
///
/// Every mutation is applied in full before subscribers run, so a subscriber
/// never observes a type together with another type's fields.
pub struct DraftStore {
    registry: Rc<LeaveVariantRegistry>,
    draft: Option<LeaveDraft>,
    generation: u64,
    subscribers: Vec<(SubscriptionId, DraftSubscriber)>,
    next_subscription: u64,
}

impl DraftStore {
    pub fn new(registry: Rc<LeaveVariantRegistry>) -> Self {
        Self::starting_after(registry, 0)
    }

    /// Store whose first seed is numbered after `generation`.
    pub fn starting_after(registry: Rc<LeaveVariantRegistry>, generation: u64) -> Self {
        Self {
            registry,
            draft: None,
            generation,
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn subscribe(&mut self, subscriber: DraftSubscriber) -> SubscriptionId {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.subscribers.push((id, subscriber));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Replaces the whole draft with a fresh one for `type_id`.
    ///
    /// Fields absent from `initial_fields` take the schema defaults; keys
    /// outside the schema are dropped. On error the current draft and
    /// generation are left untouched.
    pub fn seed(
        &mut self,
        type_id: LeaveTypeId,
        initial_fields: FieldMap,
        source_record_id: Option<String>,
    ) -> Result<u64, DialogError> {
        let descriptor = self.registry.resolve(type_id)?;
        let mut fields = descriptor.default_fields();
        for (name, value) in initial_fields {
            match descriptor.field(&name) {
                Some(def) => {
                    def.check(&value)?;
                    fields.insert(name, value);
                }
                None => log::debug!("dropping field `{}` not defined for {}", name, type_id),
            }
        }

        self.generation += 1;
        self.draft = Some(LeaveDraft {
            leave_type: type_id,
            fields,
            source_record_id,
            generation: self.generation,
        });
        if let Some(draft) = &self.draft {
            self.notify(DraftEvent::Seeded(draft));
        }
        Ok(self.generation)
    }

    /// Sets one field of the active draft. Subscribers are only notified when
    /// the value actually changed.
    pub fn update(&mut self, field_name: &str, value: FieldValue) -> Result<(), DialogError> {
        let draft = self.draft.as_mut().ok_or(DialogError::NoActiveDraft)?;
        let descriptor = self.registry.resolve(draft.leave_type)?;
        let def = descriptor
            .field(field_name)
            .ok_or_else(|| DialogError::UnknownField {
                leave_type: draft.leave_type,
                field: field_name.to_string(),
            })?;
        def.check(&value)?;

        if draft.fields.get(field_name) == Some(&value) {
            return Ok(());
        }
        draft.fields.insert(field_name.to_string(), value);

        if let Some(draft) = &self.draft {
            self.notify(DraftEvent::Updated {
                draft,
                field: field_name,
            });
        }
        Ok(())
    }

    /// Drops the visible draft and advances the generation so pending work
    /// against it goes stale.
    pub fn clear(&mut self) -> u64 {
        self.generation += 1;
        if self.draft.take().is_some() {
            self.notify(DraftEvent::Cleared {
                generation: self.generation,
            });
        }
        self.generation
    }

    /// Ends the session: final `Cleared` notification, then every
    /// subscription is released. Returns the retired generation.
    pub fn teardown(mut self) -> u64 {
        self.generation += 1;
        self.draft = None;
        self.notify(DraftEvent::Cleared {
            generation: self.generation,
        });
        self.subscribers.clear();
        self.generation
    }

    pub fn snapshot(&self) -> Result<LeaveDraft, DialogError> {
        self.draft.clone().ok_or(DialogError::NoActiveDraft)
    }

    pub fn active(&self) -> Option<&LeaveDraft> {
        self.draft.as_ref()
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn registry(&self) -> &Rc<LeaveVariantRegistry> {
        &self.registry
    }

    fn notify(&self, event: DraftEvent<'_>) {
        for (_, subscriber) in &self.subscribers {
            subscriber(event);
        }
    }
}
