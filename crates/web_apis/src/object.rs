//! Minimal object model: property keys, values, descriptors and the
//! ordinary object semantics platform objects fall back to.

use common::{BrowserError, BrowserResult};
use indexmap::IndexMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Identity of an object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Allocate a new object identity.
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Well-known symbols that platform objects care about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    ToPrimitive,
    ToStringTag,
    HasInstance,
    IsConcatSpreadable,
}

impl WellKnownSymbol {
    pub fn description(&self) -> &'static str {
        match self {
            WellKnownSymbol::ToPrimitive => "Symbol.toPrimitive",
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
            WellKnownSymbol::HasInstance => "Symbol.hasInstance",
            WellKnownSymbol::IsConcatSpreadable => "Symbol.isConcatSpreadable",
        }
    }
}

/// Property key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(WellKnownSymbol),
}

impl PropertyKey {
    /// Array index value of the key, if it is one.
    fn array_index(&self) -> Option<u32> {
        match self {
            PropertyKey::String(s) => {
                if s.len() > 1 && s.starts_with('0') {
                    return None;
                }
                s.parse::<u32>().ok().filter(|i| *i != u32::MAX)
            }
            PropertyKey::Symbol(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        PropertyKey::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::String(s)
    }
}

impl From<WellKnownSymbol> for PropertyKey {
    fn from(symbol: WellKnownSymbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::String(s) => f.write_str(s),
            PropertyKey::Symbol(symbol) => write!(f, "[{}]", symbol.description()),
        }
    }
}

type NativeBehavior = dyn Fn(&JsValue, &[JsValue]) -> BrowserResult<JsValue> + Send + Sync;

/// A host-provided function. Compared by identity.
#[derive(Clone)]
pub struct NativeFunction {
    name: Arc<str>,
    behavior: Arc<NativeBehavior>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, behavior: F) -> Self
    where
        F: Fn(&JsValue, &[JsValue]) -> BrowserResult<JsValue> + Send + Sync + 'static,
    {
        Self {
            name: Arc::from(name),
            behavior: Arc::new(behavior),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Call the function with `this` bound to `this`.
    pub fn call(&self, this: &JsValue, args: &[JsValue]) -> BrowserResult<JsValue> {
        (self.behavior)(this, args)
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.behavior, &other.behavior)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "function {}() {{ [native code] }}", self.name)
    }
}

/// A script value.
#[derive(Clone, Debug, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(ObjectId),
    Function(NativeFunction),
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    /// SameValue comparison.
    pub fn same_value(&self, other: &JsValue) -> bool {
        match (self, other) {
            (JsValue::Number(a), JsValue::Number(b)) => {
                (a.is_nan() && b.is_nan()) || (a == b && a.is_sign_negative() == b.is_sign_negative())
            }
            _ => self == other,
        }
    }

    /// String conversion used for `USVString` arguments.
    pub fn to_usv_string(&self) -> String {
        match self {
            JsValue::Undefined => "undefined".to_string(),
            JsValue::Null => "null".to_string(),
            JsValue::Boolean(b) => b.to_string(),
            JsValue::Number(n) => format_number(*n),
            JsValue::String(s) => s.clone(),
            JsValue::Object(_) => "[object Object]".to_string(),
            JsValue::Function(f) => format!("{:?}", f),
        }
    }

    /// The string value, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            JsValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for JsValue {
    fn from(s: &str) -> Self {
        JsValue::String(s.to_string())
    }
}

impl From<String> for JsValue {
    fn from(s: String) -> Self {
        JsValue::String(s)
    }
}

fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let s = if n > 0.0 { "Infinity" } else { "-Infinity" };
        s.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// The value part of a property.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertySlot {
    Data {
        value: JsValue,
        writable: bool,
    },
    Accessor {
        get: Option<NativeFunction>,
        set: Option<NativeFunction>,
    },
}

/// A complete property descriptor.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDescriptor {
    pub slot: PropertySlot,
    pub enumerable: bool,
    pub configurable: bool,
}

impl PropertyDescriptor {
    /// Data property descriptor.
    pub fn data(value: JsValue, writable: bool, enumerable: bool, configurable: bool) -> Self {
        Self {
            slot: PropertySlot::Data { value, writable },
            enumerable,
            configurable,
        }
    }

    /// Writable, enumerable, configurable data property, as created by
    /// plain assignment.
    pub fn plain(value: JsValue) -> Self {
        Self::data(value, true, true, true)
    }

    /// Accessor property descriptor.
    pub fn accessor(
        get: Option<NativeFunction>,
        set: Option<NativeFunction>,
        enumerable: bool,
        configurable: bool,
    ) -> Self {
        Self {
            slot: PropertySlot::Accessor { get, set },
            enumerable,
            configurable,
        }
    }

    pub fn is_accessor(&self) -> bool {
        matches!(self.slot, PropertySlot::Accessor { .. })
    }

    /// Writable data property. Accessors report `false`.
    pub fn is_writable(&self) -> bool {
        matches!(self.slot, PropertySlot::Data { writable: true, .. })
    }

    /// Value of a data property.
    pub fn value(&self) -> Option<&JsValue> {
        match &self.slot {
            PropertySlot::Data { value, .. } => Some(value),
            PropertySlot::Accessor { .. } => None,
        }
    }

    pub fn getter(&self) -> Option<&NativeFunction> {
        match &self.slot {
            PropertySlot::Accessor { get, .. } => get.as_ref(),
            PropertySlot::Data { .. } => None,
        }
    }

    pub fn setter(&self) -> Option<&NativeFunction> {
        match &self.slot {
            PropertySlot::Accessor { set, .. } => set.as_ref(),
            PropertySlot::Data { .. } => None,
        }
    }

    /// Check if `self` may replace `current` on a non-configurable property.
    fn is_compatible_with(&self, current: &PropertyDescriptor) -> bool {
        if current.configurable {
            return true;
        }
        if self.configurable || self.enumerable != current.enumerable {
            return false;
        }
        match (&current.slot, &self.slot) {
            (
                PropertySlot::Data { value: current_value, writable: current_writable },
                PropertySlot::Data { value, writable },
            ) => *current_writable || (!*writable && value.same_value(current_value)),
            (
                PropertySlot::Accessor { get: current_get, set: current_set },
                PropertySlot::Accessor { get, set },
            ) => get == current_get && set == current_set,
            _ => false,
        }
    }
}

/// An object with ordinary internal methods.
#[derive(Clone, Debug)]
pub struct OrdinaryObject {
    id: ObjectId,
    prototype: Option<ObjectId>,
    extensible: bool,
    properties: IndexMap<PropertyKey, PropertyDescriptor>,
}

impl OrdinaryObject {
    /// Create an empty extensible object.
    pub fn new(prototype: Option<ObjectId>) -> Self {
        Self {
            id: ObjectId::next(),
            prototype,
            extensible: true,
            properties: IndexMap::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn get_prototype_of(&self) -> Option<ObjectId> {
        self.prototype
    }

    pub fn set_prototype_of(&mut self, prototype: Option<ObjectId>) -> bool {
        if prototype == self.prototype {
            return true;
        }
        if !self.extensible {
            return false;
        }
        self.prototype = prototype;
        true
    }

    pub fn is_extensible(&self) -> bool {
        self.extensible
    }

    pub fn prevent_extensions(&mut self) -> bool {
        self.extensible = false;
        true
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        self.properties.get(key).cloned()
    }

    /// Define or redefine an own property. Returns `false` when rejected.
    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        let allowed = match self.properties.get(&key) {
            None => self.extensible,
            Some(current) => desc.is_compatible_with(current),
        };
        if !allowed {
            return false;
        }

        // Redefinition keeps the key's original position.
        self.properties.insert(key, desc);
        true
    }

    /// Delete an own property. Non-configurable properties are kept.
    pub fn delete(&mut self, key: &PropertyKey) -> bool {
        match self.properties.get(key) {
            None => true,
            Some(desc) if !desc.configurable => false,
            Some(_) => {
                self.properties.shift_remove(key);
                true
            }
        }
    }

    /// Own keys: array indices ascending, then strings and then symbols in
    /// insertion order.
    pub fn own_property_keys(&self) -> Vec<PropertyKey> {
        let mut indices: Vec<(u32, &PropertyKey)> = self
            .properties
            .keys()
            .filter_map(|key| key.array_index().map(|i| (i, key)))
            .collect();
        indices.sort_by_key(|(i, _)| *i);

        let strings = self
            .properties
            .keys()
            .filter(|key| matches!(key, PropertyKey::String(_)) && key.array_index().is_none());
        let symbols = self
            .properties
            .keys()
            .filter(|key| matches!(key, PropertyKey::Symbol(_)));

        indices
            .into_iter()
            .map(|(_, key)| key)
            .chain(strings)
            .chain(symbols)
            .cloned()
            .collect()
    }
}

/// Something a property assignment can land on.
///
/// `set` defines the new data property on the receiver through its own
/// internal methods, so a receiver may apply its own policy.
pub trait PropertyReceiver {
    /// The value bound to `this` when accessors run.
    fn receiver_value(&self) -> JsValue;

    fn receiver_own_property(&self, key: &PropertyKey) -> BrowserResult<Option<PropertyDescriptor>>;

    fn receiver_define_property(&self, key: PropertyKey, desc: PropertyDescriptor) -> BrowserResult<bool>;
}

impl PropertyReceiver for parking_lot::RwLock<OrdinaryObject> {
    fn receiver_value(&self) -> JsValue {
        JsValue::Object(self.read().id())
    }

    fn receiver_own_property(&self, key: &PropertyKey) -> BrowserResult<Option<PropertyDescriptor>> {
        Ok(self.read().get_own_property(key))
    }

    fn receiver_define_property(&self, key: PropertyKey, desc: PropertyDescriptor) -> BrowserResult<bool> {
        Ok(self.write().define_own_property(key, desc))
    }
}

/// Fetch argument `index`, failing like a binding layer would when a
/// required argument is missing.
pub fn required_arg<'a>(args: &'a [JsValue], index: usize, operation: &str) -> BrowserResult<&'a JsValue> {
    args.get(index).ok_or_else(|| {
        BrowserError::type_error(format!(
            "{}: {} argument required, but only {} present",
            operation,
            index + 1,
            args.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_redefine() {
        let mut obj = OrdinaryObject::new(None);
        assert!(obj.define_own_property("a".into(), PropertyDescriptor::plain(JsValue::Number(1.0))));
        assert!(obj.define_own_property("a".into(), PropertyDescriptor::plain(JsValue::Number(2.0))));
        assert_eq!(
            obj.get_own_property(&"a".into()).unwrap().value(),
            Some(&JsValue::Number(2.0))
        );
    }

    #[test]
    fn test_non_configurable_is_locked() {
        let mut obj = OrdinaryObject::new(None);
        let frozen = PropertyDescriptor::data(JsValue::from("x"), false, true, false);
        assert!(obj.define_own_property("k".into(), frozen.clone()));

        // Identical redefinition is allowed, anything else is not.
        assert!(obj.define_own_property("k".into(), frozen));
        assert!(!obj.define_own_property("k".into(), PropertyDescriptor::plain(JsValue::from("y"))));
        assert!(!obj.delete(&"k".into()));
        assert!(obj.delete(&"missing".into()));
    }

    #[test]
    fn test_own_keys_order() {
        let mut obj = OrdinaryObject::new(None);
        for key in ["b", "10", "a", "2"] {
            obj.define_own_property(key.into(), PropertyDescriptor::plain(JsValue::Null));
        }
        obj.define_own_property(
            WellKnownSymbol::ToPrimitive.into(),
            PropertyDescriptor::plain(JsValue::Undefined),
        );
        obj.define_own_property("c".into(), PropertyDescriptor::plain(JsValue::Null));

        let keys: Vec<String> = obj.own_property_keys().iter().map(ToString::to_string).collect();
        assert_eq!(keys, vec!["2", "10", "b", "a", "c", "[Symbol.toPrimitive]"]);
    }

    #[test]
    fn test_prevent_extensions() {
        let mut obj = OrdinaryObject::new(Some(ObjectId::next()));
        assert!(obj.prevent_extensions());
        assert!(!obj.define_own_property("late".into(), PropertyDescriptor::plain(JsValue::Null)));
        assert!(!obj.set_prototype_of(None));
    }

    #[test]
    fn test_native_function_identity() {
        let f = NativeFunction::new("f", |_, _| Ok(JsValue::Undefined));
        let g = NativeFunction::new("f", |_, _| Ok(JsValue::Undefined));

        assert_eq!(f, f.clone());
        assert_ne!(f, g);
        assert_eq!(format!("{:?}", f), "function f() { [native code] }");
    }

    #[test]
    fn test_same_value() {
        assert!(JsValue::Number(f64::NAN).same_value(&JsValue::Number(f64::NAN)));
        assert!(!JsValue::Number(0.0).same_value(&JsValue::Number(-0.0)));
        assert!(JsValue::from("a").same_value(&JsValue::from("a")));
    }

    #[test]
    fn test_usv_string_conversion() {
        assert_eq!(JsValue::Number(8080.0).to_usv_string(), "8080");
        assert_eq!(JsValue::Number(1.5).to_usv_string(), "1.5");
        assert_eq!(JsValue::Null.to_usv_string(), "null");
        assert_eq!(JsValue::Boolean(true).to_usv_string(), "true");
    }

    #[test]
    fn test_required_arg() {
        let args = [JsValue::from("x")];
        assert!(required_arg(&args, 0, "assign").is_ok());
        let err = required_arg(&[], 0, "assign").unwrap_err();
        assert_eq!(err.dom_exception_name(), "TypeError");
    }
}
