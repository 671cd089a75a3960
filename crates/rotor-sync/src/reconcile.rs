//! Focus guard between pushed state and fields the operator is editing.
//!
//! The controller broadcasts its state many times per second. Without a
//! guard each broadcast would reset the heading, vertical-speed and altitude
//! inputs while the operator is typing into them. Whoever owns the inputs
//! tells the reconciler which fields are currently under edit; those fields
//! are skipped for that update, everything else is overwritten.

use std::collections::HashSet;
use std::fmt;

use crate::model::{wrap_heading, AutopilotState};

/// Control values that have an editable on-screen counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditableField {
    SelectedHeading,
    SelectedVerticalSpeed,
    SelectedAltitude,
}

impl EditableField {
    pub const ALL: [EditableField; 3] = [
        EditableField::SelectedHeading,
        EditableField::SelectedVerticalSpeed,
        EditableField::SelectedAltitude,
    ];

    pub fn short_name(self) -> &'static str {
        match self {
            EditableField::SelectedHeading => "hdg",
            EditableField::SelectedVerticalSpeed => "vs",
            EditableField::SelectedAltitude => "alt",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        EditableField::ALL
            .into_iter()
            .find(|field| field.short_name() == name)
    }

    fn server_value(self, autopilot: &AutopilotState) -> Option<f64> {
        match self {
            EditableField::SelectedHeading => autopilot.selected_heading,
            EditableField::SelectedVerticalSpeed => autopilot.selected_vertical_speed,
            EditableField::SelectedAltitude => autopilot.selected_altitude,
        }
    }
}

impl fmt::Display for EditableField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Answers whether a field is under direct operator control right now.
pub trait EditGuard {
    fn is_editing(&self, field: EditableField) -> bool;
}

impl<F> EditGuard for F
where
    F: Fn(EditableField) -> bool,
{
    fn is_editing(&self, field: EditableField) -> bool {
        (self)(field)
    }
}

/// Set of fields the operator has claimed.
#[derive(Debug, Default, Clone)]
pub struct EditSet {
    fields: HashSet<EditableField>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the field was already claimed.
    pub fn begin(&mut self, field: EditableField) -> bool {
        self.fields.insert(field)
    }

    /// Returns `false` if the field was not claimed.
    pub fn end(&mut self, field: EditableField) -> bool {
        self.fields.remove(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl EditGuard for EditSet {
    fn is_editing(&self, field: EditableField) -> bool {
        self.fields.contains(&field)
    }
}

/// Current values of the editable inputs. `None` until the first update
/// (or local keystroke) gives the field a value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControlInputs {
    pub selected_heading: Option<f64>,
    pub selected_vertical_speed: Option<f64>,
    pub selected_altitude: Option<f64>,
}

impl ControlInputs {
    pub fn get(&self, field: EditableField) -> Option<f64> {
        *self.slot(field)
    }

    /// Record a local keystroke. Headings are wrapped like the server does.
    pub fn set_local(&mut self, field: EditableField, value: f64) {
        let value = match field {
            EditableField::SelectedHeading => wrap_heading(value),
            _ => value,
        };
        *self.slot_mut(field) = Some(value);
    }

    fn slot(&self, field: EditableField) -> &Option<f64> {
        match field {
            EditableField::SelectedHeading => &self.selected_heading,
            EditableField::SelectedVerticalSpeed => &self.selected_vertical_speed,
            EditableField::SelectedAltitude => &self.selected_altitude,
        }
    }

    fn slot_mut(&mut self, field: EditableField) -> &mut Option<f64> {
        match field {
            EditableField::SelectedHeading => &mut self.selected_heading,
            EditableField::SelectedVerticalSpeed => &mut self.selected_vertical_speed,
            EditableField::SelectedAltitude => &mut self.selected_altitude,
        }
    }
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub updated: Vec<EditableField>,
    pub suppressed: Vec<EditableField>,
}

impl ReconcileReport {
    pub fn is_suppressed(&self, field: EditableField) -> bool {
        self.suppressed.contains(&field)
    }
}

/// Copy server values into `inputs`, skipping fields under edit.
///
/// A suppressed field is only reported when the server value actually
/// differs from what the operator has in the input.
pub fn reconcile(
    inputs: &mut ControlInputs,
    autopilot: &AutopilotState,
    guard: &dyn EditGuard,
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for field in EditableField::ALL {
        let incoming = field.server_value(autopilot);
        let current = inputs.slot_mut(field);
        if guard.is_editing(field) {
            if *current != incoming {
                report.suppressed.push(field);
            }
            continue;
        }
        if *current != incoming {
            *current = incoming;
            report.updated.push(field);
        }
    }
    report
}
