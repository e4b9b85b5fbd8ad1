//! Origin-gated facade over the location object.
//!
//! Every structural operation on a location object goes through
//! [`LocationProxy`]. Callers that are same-origin-domain with the owning
//! document see ordinary object semantics, except that the members present
//! at construction time can be neither redefined nor deleted. Everyone else
//! sees the small cross-origin surface: by default writing `href` and
//! calling `replace`, which is what lets a frame navigate another frame it
//! cannot otherwise inspect.

use crate::config::{CrossOriginProperty, LocationConfig};
use crate::location::Location;
use crate::object::{
    required_arg, JsValue, NativeFunction, ObjectId, OrdinaryObject, PropertyDescriptor,
    PropertyKey, PropertyReceiver, PropertySlot, WellKnownSymbol,
};
use browser_security::{Origin, OriginPolicy};
use common::{BrowserError, BrowserResult};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Keys every cross-origin object answers with `undefined`.
const CROSS_ORIGIN_FALLBACK_KEYS: [WellKnownSymbol; 3] = [
    WellKnownSymbol::ToStringTag,
    WellKnownSymbol::HasInstance,
    WellKnownSymbol::IsConcatSpreadable,
];

type Getter = fn(&Location) -> BrowserResult<String>;
type Setter = fn(&Location, &str) -> BrowserResult<()>;

/// How a caller relates to the owning document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    SameOrigin,
    CrossOrigin,
}

/// A structural operation on the location object.
#[derive(Clone, Debug)]
pub enum ObjectOperation {
    GetOwnProperty(PropertyKey),
    Get(PropertyKey),
    Set(PropertyKey, JsValue),
    DefineOwnProperty(PropertyKey, PropertyDescriptor),
    Delete(PropertyKey),
    OwnPropertyKeys,
    GetPrototypeOf,
    SetPrototypeOf(Option<ObjectId>),
    IsExtensible,
    PreventExtensions,
}

/// Result of an [`ObjectOperation`].
#[derive(Clone, Debug, PartialEq)]
pub enum OperationOutcome {
    Descriptor(Option<PropertyDescriptor>),
    Value(JsValue),
    Success(bool),
    Keys(Vec<PropertyKey>),
    Prototype(Option<ObjectId>),
}

/// The location object as exposed to callers.
pub struct LocationProxy {
    location: Arc<Location>,
    /// The wrapped object carrying the members and any expandos.
    target: RwLock<OrdinaryObject>,
    /// Own keys of the freshly built object. Never modified.
    default_properties: HashSet<PropertyKey>,
    cross_origin_properties: Vec<CrossOriginProperty>,
    policy: OriginPolicy,
    /// Cross-origin descriptors handed out so far, per caller origin, so a
    /// caller always sees the same function objects. Entries live as long as
    /// the location object, one set per distinct caller origin.
    cross_origin_descriptors: RwLock<HashMap<(Origin, PropertyKey), PropertyDescriptor>>,
}

impl LocationProxy {
    /// Build the location object for `location` and capture its default
    /// properties.
    pub fn new(location: Arc<Location>, prototype: Option<ObjectId>, config: &LocationConfig) -> Self {
        let mut target = OrdinaryObject::new(prototype);
        install_members(&mut target, &location);

        let default_properties = target.own_property_keys().into_iter().collect();

        Self {
            location,
            target: RwLock::new(target),
            default_properties,
            cross_origin_properties: config.cross_origin_properties.clone(),
            policy: config.origin_policy,
            cross_origin_descriptors: RwLock::new(HashMap::new()),
        }
    }

    /// The underlying location.
    pub fn location(&self) -> &Arc<Location> {
        &self.location
    }

    /// Identity of the location object.
    pub fn object_id(&self) -> ObjectId {
        self.target.read().id()
    }

    /// Keys captured when the object was built.
    pub fn default_properties(&self) -> &HashSet<PropertyKey> {
        &self.default_properties
    }

    fn is_default_property(&self, key: &PropertyKey) -> bool {
        self.default_properties.contains(key)
    }

    /// Classify a caller. A discarded owning document makes every caller
    /// cross-origin.
    pub fn access(&self, caller: &Origin) -> Access {
        let owner = match self.location.owner() {
            Some(document) => document.read().origin().clone(),
            None => return Access::CrossOrigin,
        };

        if self.policy.can_access(caller, &owner) {
            Access::SameOrigin
        } else {
            Access::CrossOrigin
        }
    }

    /// Run an operation on behalf of `caller`.
    pub fn dispatch(&self, caller: &Origin, operation: ObjectOperation) -> BrowserResult<OperationOutcome> {
        Ok(match operation {
            ObjectOperation::GetOwnProperty(key) => {
                OperationOutcome::Descriptor(self.get_own_property(caller, &key)?)
            }
            ObjectOperation::Get(key) => OperationOutcome::Value(self.get(caller, &key)?),
            ObjectOperation::Set(key, value) => OperationOutcome::Success(self.set(caller, key, value)?),
            ObjectOperation::DefineOwnProperty(key, desc) => {
                OperationOutcome::Success(self.define_own_property(caller, key, desc)?)
            }
            ObjectOperation::Delete(key) => OperationOutcome::Success(self.delete(caller, &key)?),
            ObjectOperation::OwnPropertyKeys => OperationOutcome::Keys(self.own_property_keys(caller)),
            ObjectOperation::GetPrototypeOf => OperationOutcome::Prototype(self.get_prototype_of(caller)),
            ObjectOperation::SetPrototypeOf(prototype) => {
                OperationOutcome::Success(self.set_prototype_of(caller, prototype))
            }
            ObjectOperation::IsExtensible => OperationOutcome::Success(self.is_extensible()),
            ObjectOperation::PreventExtensions => OperationOutcome::Success(self.prevent_extensions()),
        })
    }

    /// [[GetOwnProperty]]
    pub fn get_own_property(&self, caller: &Origin, key: &PropertyKey) -> BrowserResult<Option<PropertyDescriptor>> {
        match self.access(caller) {
            Access::SameOrigin => {
                let mut desc = self.target.read().get_own_property(key);
                if let Some(desc) = desc.as_mut() {
                    if self.is_default_property(key) {
                        desc.configurable = true;
                    }
                }
                Ok(desc)
            }
            Access::CrossOrigin => match self.cross_origin_descriptor(caller, key) {
                Some(desc) => Ok(Some(desc)),
                None => cross_origin_fallback(key),
            },
        }
    }

    /// [[Get]] with the location object itself as receiver.
    pub fn get(&self, caller: &Origin, key: &PropertyKey) -> BrowserResult<JsValue> {
        let receiver = SelfReceiver { proxy: self, caller };
        self.get_with_receiver(caller, key, &receiver)
    }

    /// [[Get]]
    pub fn get_with_receiver(
        &self,
        caller: &Origin,
        key: &PropertyKey,
        receiver: &dyn PropertyReceiver,
    ) -> BrowserResult<JsValue> {
        let access = self.access(caller);
        let desc = match self.get_own_property(caller, key)? {
            Some(desc) => desc,
            // The prototype contributes no members of its own.
            None => return Ok(JsValue::Undefined),
        };

        match desc.slot {
            PropertySlot::Data { value, .. } => Ok(value),
            PropertySlot::Accessor { get: Some(getter), .. } => getter.call(&receiver.receiver_value(), &[]),
            PropertySlot::Accessor { get: None, .. } => match access {
                Access::SameOrigin => Ok(JsValue::Undefined),
                Access::CrossOrigin => Err(security_error("read", key)),
            },
        }
    }

    /// [[Set]] with the location object itself as receiver.
    pub fn set(&self, caller: &Origin, key: PropertyKey, value: JsValue) -> BrowserResult<bool> {
        let receiver = SelfReceiver { proxy: self, caller };
        self.set_with_receiver(caller, key, value, &receiver)
    }

    /// [[Set]]
    pub fn set_with_receiver(
        &self,
        caller: &Origin,
        key: PropertyKey,
        value: JsValue,
        receiver: &dyn PropertyReceiver,
    ) -> BrowserResult<bool> {
        match self.access(caller) {
            Access::SameOrigin => {
                let own = self
                    .get_own_property(caller, &key)?
                    .unwrap_or_else(|| PropertyDescriptor::plain(JsValue::Undefined));
                ordinary_set(own, key, value, receiver)
            }
            Access::CrossOrigin => {
                let desc = self.get_own_property(caller, &key)?;
                match desc.as_ref().and_then(PropertyDescriptor::setter) {
                    Some(setter) => {
                        setter.call(&receiver.receiver_value(), &[value])?;
                        Ok(true)
                    }
                    None => Err(security_error("write", &key)),
                }
            }
        }
    }

    /// [[DefineOwnProperty]]
    pub fn define_own_property(
        &self,
        caller: &Origin,
        key: PropertyKey,
        desc: PropertyDescriptor,
    ) -> BrowserResult<bool> {
        match self.access(caller) {
            Access::SameOrigin if self.is_default_property(&key) => {
                tracing::debug!("Refusing to redefine location member {}", key);
                Ok(false)
            }
            Access::SameOrigin => Ok(self.target.write().define_own_property(key, desc)),
            Access::CrossOrigin => Err(security_error("define", &key)),
        }
    }

    /// [[Delete]]
    pub fn delete(&self, caller: &Origin, key: &PropertyKey) -> BrowserResult<bool> {
        match self.access(caller) {
            Access::SameOrigin if self.is_default_property(key) => {
                tracing::debug!("Refusing to delete location member {}", key);
                Ok(false)
            }
            Access::SameOrigin => Ok(self.target.write().delete(key)),
            Access::CrossOrigin => Err(security_error("delete", key)),
        }
    }

    /// [[OwnPropertyKeys]]
    pub fn own_property_keys(&self, caller: &Origin) -> Vec<PropertyKey> {
        match self.access(caller) {
            Access::SameOrigin => self.target.read().own_property_keys(),
            Access::CrossOrigin => self
                .cross_origin_properties
                .iter()
                .map(|property| PropertyKey::from(property.name()))
                .chain(std::iter::once(PropertyKey::from("then")))
                .chain(CROSS_ORIGIN_FALLBACK_KEYS.into_iter().map(PropertyKey::Symbol))
                .collect(),
        }
    }

    /// [[GetPrototypeOf]]
    pub fn get_prototype_of(&self, caller: &Origin) -> Option<ObjectId> {
        match self.access(caller) {
            Access::SameOrigin => self.target.read().get_prototype_of(),
            Access::CrossOrigin => None,
        }
    }

    /// [[SetPrototypeOf]]: the prototype is immutable, so only a no-op
    /// change succeeds.
    pub fn set_prototype_of(&self, caller: &Origin, prototype: Option<ObjectId>) -> bool {
        prototype == self.get_prototype_of(caller)
    }

    /// [[IsExtensible]]
    pub fn is_extensible(&self) -> bool {
        true
    }

    /// [[PreventExtensions]]
    pub fn prevent_extensions(&self) -> bool {
        false
    }

    /// Get a member and call it with the location object as `this`.
    pub fn invoke(&self, caller: &Origin, name: &str, args: &[JsValue]) -> BrowserResult<JsValue> {
        let key = PropertyKey::from(name);
        match self.get(caller, &key)? {
            JsValue::Function(function) => function.call(&JsValue::Object(self.object_id()), args),
            _ => Err(BrowserError::type_error(format!("location.{} is not a function", name))),
        }
    }

    /// Descriptor for a member of the cross-origin surface.
    fn cross_origin_descriptor(&self, caller: &Origin, key: &PropertyKey) -> Option<PropertyDescriptor> {
        let property = self
            .cross_origin_properties
            .iter()
            .find(|property| PropertyKey::from(property.name()) == *key)?;

        let cache_key = (caller.clone(), key.clone());
        if let Some(desc) = self.cross_origin_descriptors.read().get(&cache_key) {
            return Some(desc.clone());
        }

        let Some(own) = self.target.read().get_own_property(key) else {
            tracing::warn!("Cross-origin member {} does not exist on location", key);
            return None;
        };

        let desc = match property {
            CrossOriginProperty::Method { name } => {
                let function = match own.value() {
                    Some(JsValue::Function(function)) => function.clone(),
                    _ => return None,
                };
                PropertyDescriptor::data(
                    JsValue::Function(cross_origin_wrapper(name, function)),
                    false,
                    false,
                    true,
                )
            }
            CrossOriginProperty::Attribute { name, needs_get, needs_set } => {
                let get = own
                    .getter()
                    .filter(|_| *needs_get)
                    .map(|getter| cross_origin_wrapper(&format!("get {}", name), getter.clone()));
                let set = own
                    .setter()
                    .filter(|_| *needs_set)
                    .map(|setter| cross_origin_wrapper(&format!("set {}", name), setter.clone()));
                PropertyDescriptor::accessor(get, set, false, true)
            }
        };

        self.cross_origin_descriptors
            .write()
            .entry(cache_key)
            .or_insert(desc)
            .clone()
            .into()
    }
}

/// Receiver view of the proxy itself, so an assignment that creates a new
/// property goes back through [[DefineOwnProperty]] with the same caller.
struct SelfReceiver<'a> {
    proxy: &'a LocationProxy,
    caller: &'a Origin,
}

impl PropertyReceiver for SelfReceiver<'_> {
    fn receiver_value(&self) -> JsValue {
        JsValue::Object(self.proxy.object_id())
    }

    fn receiver_own_property(&self, key: &PropertyKey) -> BrowserResult<Option<PropertyDescriptor>> {
        self.proxy.get_own_property(self.caller, key)
    }

    fn receiver_define_property(&self, key: PropertyKey, desc: PropertyDescriptor) -> BrowserResult<bool> {
        self.proxy.define_own_property(self.caller, key, desc)
    }
}

/// OrdinarySet, given the descriptor found on the object.
fn ordinary_set(
    own: PropertyDescriptor,
    key: PropertyKey,
    value: JsValue,
    receiver: &dyn PropertyReceiver,
) -> BrowserResult<bool> {
    match own.slot {
        PropertySlot::Data { writable: false, .. } => Ok(false),
        PropertySlot::Accessor { set: None, .. } => Ok(false),
        PropertySlot::Accessor { set: Some(setter), .. } => {
            setter.call(&receiver.receiver_value(), &[value])?;
            Ok(true)
        }
        PropertySlot::Data { writable: true, .. } => match receiver.receiver_own_property(&key)? {
            Some(existing) if existing.is_accessor() || !existing.is_writable() => Ok(false),
            Some(existing) => receiver.receiver_define_property(
                key,
                PropertyDescriptor::data(value, true, existing.enumerable, existing.configurable),
            ),
            None => receiver.receiver_define_property(key, PropertyDescriptor::plain(value)),
        },
    }
}

/// Answer for keys outside the cross-origin surface.
fn cross_origin_fallback(key: &PropertyKey) -> BrowserResult<Option<PropertyDescriptor>> {
    let is_fallback = match key {
        PropertyKey::String(name) => name == "then",
        PropertyKey::Symbol(symbol) => CROSS_ORIGIN_FALLBACK_KEYS.contains(symbol),
    };

    if is_fallback {
        Ok(Some(PropertyDescriptor::data(JsValue::Undefined, false, false, true)))
    } else {
        Err(security_error("access", key))
    }
}

fn security_error(action: &str, key: &PropertyKey) -> BrowserError {
    tracing::debug!("Blocked cross-origin {} of location.{}", action, key);
    BrowserError::security(format!(
        "Blocked a cross-origin attempt to {} property \"{}\" of a Location object",
        action, key
    ))
}

/// A distinct function object calling through to `inner`.
fn cross_origin_wrapper(name: &str, inner: NativeFunction) -> NativeFunction {
    NativeFunction::new(name, move |this, args| inner.call(this, args))
}

fn check_brand(this: &JsValue, id: ObjectId) -> BrowserResult<()> {
    match this {
        JsValue::Object(object) if *object == id => Ok(()),
        _ => Err(BrowserError::type_error("Illegal invocation")),
    }
}

/// Define the unforgeable members on a fresh location object.
fn install_members(target: &mut OrdinaryObject, location: &Arc<Location>) {
    let id = target.id();

    let attributes: [(&str, Getter, Option<Setter>); 9] = [
        ("href", Location::href, Some(Location::set_href)),
        ("origin", Location::origin, None),
        ("protocol", Location::protocol, Some(Location::set_protocol)),
        ("host", Location::host, Some(Location::set_host)),
        ("hostname", Location::hostname, Some(Location::set_hostname)),
        ("port", Location::port, Some(Location::set_port)),
        ("pathname", Location::pathname, Some(Location::set_pathname)),
        ("search", Location::search, Some(Location::set_search)),
        ("hash", Location::hash, Some(Location::set_hash)),
    ];

    for (name, read, write) in attributes {
        let getter = {
            let location = location.clone();
            NativeFunction::new(&format!("get {}", name), move |this, _| {
                check_brand(this, id)?;
                read(&location).map(JsValue::String)
            })
        };
        let setter = write.map(|write| {
            let location = location.clone();
            NativeFunction::new(&format!("set {}", name), move |this, args| {
                check_brand(this, id)?;
                let value = required_arg(args, 0, name)?.to_usv_string();
                write(&location, &value)?;
                Ok(JsValue::Undefined)
            })
        });
        target.define_own_property(
            name.into(),
            PropertyDescriptor::accessor(Some(getter), setter, true, false),
        );
    }

    let navigations: [(&str, Setter); 2] = [("assign", Location::assign), ("replace", Location::replace)];
    for (name, navigate) in navigations {
        let location = location.clone();
        let method = NativeFunction::new(name, move |this, args| {
            check_brand(this, id)?;
            let url = required_arg(args, 0, name)?.to_usv_string();
            navigate(&location, &url)?;
            Ok(JsValue::Undefined)
        });
        target.define_own_property(
            name.into(),
            PropertyDescriptor::data(JsValue::Function(method), false, true, false),
        );
    }

    let reload = {
        let location = location.clone();
        NativeFunction::new("reload", move |this, _| {
            check_brand(this, id)?;
            location.reload()?;
            Ok(JsValue::Undefined)
        })
    };
    target.define_own_property(
        "reload".into(),
        PropertyDescriptor::data(JsValue::Function(reload), false, true, false),
    );

    let to_string = {
        let location = location.clone();
        NativeFunction::new("toString", move |this, _| {
            check_brand(this, id)?;
            location.stringify().map(JsValue::String)
        })
    };
    target.define_own_property(
        "toString".into(),
        PropertyDescriptor::data(JsValue::Function(to_string), false, true, false),
    );

    let value_of = NativeFunction::new("valueOf", |this, _| Ok(this.clone()));
    target.define_own_property(
        "valueOf".into(),
        PropertyDescriptor::data(JsValue::Function(value_of), false, false, false),
    );
    target.define_own_property(
        WellKnownSymbol::ToPrimitive.into(),
        PropertyDescriptor::data(JsValue::Undefined, false, false, false),
    );
}
