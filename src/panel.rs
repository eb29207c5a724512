//! Parameter panel: named numeric controls bound to scene state.
//!
//! The widget toolkit itself lives outside the crate. A host (keyboard on
//! native, an exported setter on the web) drives the controls through
//! [`Panel::set`] and [`Panel::nudge`].

use std::fmt;

use crate::scene::Scene;

type OnChange = Box<dyn FnMut(f32, &mut Scene)>;

/// A bounded numeric value with a change callback.
pub struct NumericControl {
    key: String,
    label: String,
    value: f32,
    min: f32,
    max: f32,
    step: f32,
    on_change: Option<OnChange>,
}

impl fmt::Debug for NumericControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NumericControl")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("value", &self.value)
            .field("min", &self.min)
            .field("max", &self.max)
            .field("step", &self.step)
            .finish_non_exhaustive()
    }
}

impl NumericControl {
    /// Unbounded control with no step. The label defaults to `key`.
    pub fn new(key: impl Into<String>, value: f32) -> Self {
        let key = key.into();
        Self {
            label: key.clone(),
            key,
            value,
            min: f32::NEG_INFINITY,
            max: f32::INFINITY,
            step: 0.0,
            on_change: None,
        }
    }

    pub fn min(mut self, min: f32) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: f32) -> Self {
        self.max = max;
        self
    }

    pub fn step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    pub fn name(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn on_change(mut self, f: impl FnMut(f32, &mut Scene) + 'static) -> Self {
        self.on_change = Some(Box::new(f));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    /// Clamps and snaps `value`, then stores it and fires the callback if it
    /// differs from the current value. Returns whether it changed.
    pub fn set(&mut self, value: f32, scene: &mut Scene) -> bool {
        let value = self.normalize(value);
        if value == self.value {
            return false;
        }
        self.value = value;
        if let Some(on_change) = self.on_change.as_mut() {
            on_change(value, scene);
        }
        true
    }

    /// Moves the value by whole steps (by 1% of the range when stepless).
    pub fn nudge(&mut self, steps: i32, scene: &mut Scene) -> bool {
        let step = if self.step > 0.0 {
            self.step
        } else if (self.max - self.min).is_finite() {
            (self.max - self.min) / 100.0
        } else {
            1.0
        };
        self.set(self.value + step * steps as f32, scene)
    }

    fn normalize(&self, value: f32) -> f32 {
        let clamped = value.max(self.min).min(self.max);
        if self.step <= 0.0 {
            return clamped;
        }
        // snap in f64 so values like 0.07 survive `/ 0.01 * 0.01`
        let step = self.step as f64;
        let snapped = ((clamped as f64 / step).round() * step) as f32;
        snapped.max(self.min).min(self.max)
    }
}

#[derive(Debug)]
pub struct Panel {
    title: String,
    controls: Vec<NumericControl>,
}

impl Panel {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            controls: Vec::new(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Registers `control`, replacing an existing one with the same key.
    pub fn add(&mut self, control: NumericControl) {
        match self.controls.iter_mut().find(|c| c.key == control.key) {
            Some(existing) => *existing = control,
            None => self.controls.push(control),
        }
    }

    pub fn get(&self, key: &str) -> Option<&NumericControl> {
        self.controls.iter().find(|c| c.key == key)
    }

    pub fn controls(&self) -> &[NumericControl] {
        &self.controls
    }

    /// Returns `None` if no control is registered under `key`.
    pub fn set(&mut self, key: &str, value: f32, scene: &mut Scene) -> Option<bool> {
        let control = self.controls.iter_mut().find(|c| c.key == key)?;
        Some(control.set(value, scene))
    }

    pub fn nudge(&mut self, key: &str, steps: i32, scene: &mut Scene) -> Option<bool> {
        let control = self.controls.iter_mut().find(|c| c.key == key)?;
        Some(control.nudge(steps, scene))
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use super::*;
    use crate::config::SceneConfig;

    fn scene() -> Scene {
        Scene::new(&SceneConfig::default(), 1.0)
    }

    fn recorded(value: f32) -> (NumericControl, Rc<RefCell<Vec<f32>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let control = NumericControl::new("emissiveIntensity", value)
            .min(0.0)
            .max(5.0)
            .step(0.01)
            .on_change(move |v, _| sink.borrow_mut().push(v));
        (control, seen)
    }

    #[test]
    fn values_are_clamped_to_range() {
        let mut scene = scene();
        let (mut control, seen) = recorded(5.0);

        assert!(control.set(-3.0, &mut scene));
        assert_eq!(control.value(), 0.0);
        assert!(control.set(12.0, &mut scene));
        assert_eq!(control.value(), 5.0);
        assert_eq!(*seen.borrow(), vec![0.0, 5.0]);
    }

    #[test]
    fn values_snap_to_step() {
        let mut scene = scene();
        let (mut control, _) = recorded(5.0);

        control.set(2.344, &mut scene);
        assert!((control.value() - 2.34).abs() < 1e-6);
        control.set(0.07, &mut scene);
        assert!((control.value() - 0.07).abs() < 1e-6);
    }

    #[test]
    fn unchanged_value_does_not_fire() {
        let mut scene = scene();
        let (mut control, seen) = recorded(5.0);

        assert!(!control.set(5.0, &mut scene));
        assert!(!control.set(7.0, &mut scene));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn nudge_moves_by_steps() {
        let mut scene = scene();
        let (mut control, _) = recorded(1.0);

        control.nudge(10, &mut scene);
        assert!((control.value() - 1.1).abs() < 1e-6);
        control.nudge(-20, &mut scene);
        assert!((control.value() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn panel_routes_by_key() {
        let mut scene = scene();
        let mut panel = Panel::new("Red Hot Floppy");
        assert!(panel.set("emissiveIntensity", 1.0, &mut scene).is_none());

        let (control, seen) = recorded(5.0);
        panel.add(control.name("Glow"));

        assert_eq!(panel.set("emissiveIntensity", 1.0, &mut scene), Some(true));
        assert_eq!(panel.get("emissiveIntensity").map(|c| c.label()), Some("Glow"));
        assert_eq!(*seen.borrow(), vec![1.0]);
    }

    #[test]
    fn re_adding_a_key_replaces_the_control() {
        let mut panel = Panel::new("test");
        panel.add(NumericControl::new("a", 1.0));
        panel.add(NumericControl::new("a", 2.0));

        assert_eq!(panel.controls().len(), 1);
        assert_eq!(panel.get("a").map(|c| c.value()), Some(2.0));
    }
}
