//! Routing of namespaced remote updates onto node parameters.

/*
Parameter Routing
=================

A remote update is a batch of `"namespace:name" = value` pairs. Each bound
namespace points at one node in the graph:

    "audio-player:control" = "start"   ─┐
    "audio-player:period"  = 0.2        ├─→ player
    "mix:volume"           = -6         ├─→ mix bus
    "other:thing"          = 1          ┘   (no route: ignored)

For every key with a bound prefix:

    1. strip the prefix              "audio-player:period" → "period"
    2. look the key up in the schema float 0.05..1
    3. clamp the value
    4. dispatch by declared type:

       enum            run the action named by the value ("start" → start)
       float/integer   smoothable channel → set_target_at_time(v, now, 0.01)
                       plain field        → assign
       boolean         assign

Node types publish their setters as a static dispatch table of named
function pointers. A route looks its setters up in a map built once at
bind time, so nothing is resolved by name at render time beyond a hash
lookup.

A bad key never stops the batch. Every failure is collected in the report
and logged, and the remaining keys are still applied.
*/

use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::{
    de::{MapAccess, Visitor},
    ser::SerializeMap,
    Deserialize, Deserializer, Serialize, Serializer,
};
use thiserror::Error;
use tracing::{debug, warn};

use super::{ParamKind, ParamSpec, ParamTable, ParamValue, Schema, ValueError};
use crate::{
    engine::scheduler::Scheduler,
    graph::{
        node::{NodeHandle, SignalNode},
        param::{ParameterChannel, LIVE_TIME_CONSTANT},
        patch::SignalGraph,
        GraphError,
    },
};

#[derive(Error, Debug)]
pub enum RouteError {
    #[error("Unknown parameter `{0}`")]
    UnknownKey(String),

    #[error("`{key}`: {source}")]
    InvalidValue {
        key: String,
        #[source]
        source: ValueError,
    },

    #[error("`{key}` has no action `{value}`")]
    UnknownEnumValue { key: String, value: String },

    #[error("`{key}` is declared {declared} but its setter takes another type")]
    TypeMismatch { key: String, declared: &'static str },

    #[error("`{0}` is not available on this node")]
    UnsupportedParameter(String),

    #[error("`{key}`: {source}")]
    Node {
        key: String,
        #[source]
        source: GraphError,
    },
}

/// What a control action sees besides its node.
pub struct ControlCtx<'a> {
    /// Logical time the update is applied at.
    pub now: f64,
    pub scheduler: &'a mut dyn Scheduler,
}

/// How one parameter is written on a node of type `N`.
pub enum Setter<N: 'static> {
    /// A smoothable channel. `None` when the node was built without it.
    Channel(fn(&mut N) -> Option<&mut dyn ParameterChannel>),
    /// Direct numeric assignment.
    Float(fn(&mut N, f64)),
    /// Direct boolean assignment, at `now`.
    Bool(fn(&mut N, bool, f64)),
    /// One action per enum value.
    Enum(&'static [(&'static str, fn(&mut N, &mut ControlCtx<'_>))]),
}

pub type DispatchTable<N> = &'static [(&'static str, Setter<N>)];

/// A node type that can be driven by remote updates.
pub trait Controllable: SignalNode + Sized {
    const PARAMS: ParamTable;
    const DISPATCH: DispatchTable<Self>;
}

trait Route: Send {
    fn namespace(&self) -> &str;

    fn apply(
        &self,
        key: &str,
        name: &str,
        value: &ParamValue,
        spec: &ParamSpec,
        graph: &mut SignalGraph,
        ctx: &mut ControlCtx<'_>,
    ) -> Result<(), RouteError>;
}

struct TypedRoute<N: 'static> {
    namespace: String,
    handle: NodeHandle<N>,
    setters: HashMap<&'static str, &'static Setter<N>>,
}

impl<N: Controllable> Route for TypedRoute<N> {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn apply(
        &self,
        key: &str,
        name: &str,
        value: &ParamValue,
        spec: &ParamSpec,
        graph: &mut SignalGraph,
        ctx: &mut ControlCtx<'_>,
    ) -> Result<(), RouteError> {
        let setter = self
            .setters
            .get(name)
            .ok_or_else(|| RouteError::UnknownKey(key.to_string()))?;
        let node = graph.get_mut(self.handle).map_err(|source| RouteError::Node {
            key: key.to_string(),
            source,
        })?;
        let mismatch = || RouteError::TypeMismatch {
            key: key.to_string(),
            declared: spec.kind.name(),
        };

        match (spec.kind, setter) {
            (ParamKind::Enum { .. }, Setter::Enum(actions)) => {
                let action = value.as_str().unwrap_or_default();
                let (_, run) = actions
                    .iter()
                    .find(|(label, _)| *label == action)
                    .ok_or_else(|| RouteError::UnknownEnumValue {
                        key: key.to_string(),
                        value: action.to_string(),
                    })?;
                run(node, ctx);
            }
            (ParamKind::Float { .. } | ParamKind::Integer { .. }, Setter::Channel(channel)) => {
                let v = value.as_f64().ok_or_else(mismatch)?;
                channel(node)
                    .ok_or_else(|| RouteError::UnsupportedParameter(key.to_string()))?
                    .set_target_at_time(v as f32, ctx.now, LIVE_TIME_CONSTANT);
            }
            (ParamKind::Float { .. } | ParamKind::Integer { .. }, Setter::Float(set)) => {
                set(node, value.as_f64().ok_or_else(mismatch)?);
            }
            (ParamKind::Boolean, Setter::Bool(set)) => {
                set(node, value.as_bool().ok_or_else(mismatch)?, ctx.now);
            }
            _ => return Err(mismatch()),
        }
        Ok(())
    }
}

/// Outcome of one batch.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: usize,
    /// Keys without a bound namespace.
    pub ignored: usize,
    pub errors: Vec<RouteError>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Default)]
pub struct ParameterRouter {
    routes: Vec<Box<dyn Route>>,
}

impl ParameterRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route keys `"{namespace}:*"` to `handle`.
    pub fn bind<N: Controllable>(&mut self, namespace: impl Into<String>, handle: NodeHandle<N>) {
        let namespace = namespace.into();
        let setters = N::DISPATCH
            .iter()
            .map(|(name, setter)| (*name, setter))
            .collect();
        debug!(%namespace, node = %handle.id(), "bound namespace");
        self.routes.push(Box::new(TypedRoute {
            namespace,
            handle,
            setters,
        }));
    }

    pub fn is_bound(&self, namespace: &str) -> bool {
        self.routes.iter().any(|route| route.namespace() == namespace)
    }

    pub fn apply(
        &self,
        update: &ParameterUpdate,
        schema: &Schema,
        graph: &mut SignalGraph,
        ctx: &mut ControlCtx<'_>,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (key, value) in update.iter() {
            let Some((route, name)) = self.routes.iter().find_map(|route| {
                key.strip_prefix(route.namespace())
                    .and_then(|rest| rest.strip_prefix(':'))
                    .map(|name| (route, name))
            }) else {
                report.ignored += 1;
                continue;
            };

            let result = schema
                .get(key)
                .ok_or_else(|| RouteError::UnknownKey(key.to_string()))
                .and_then(|spec| {
                    let value = spec.clamp(value).map_err(|source| match source {
                        ValueError::UnknownEnumValue(value) => RouteError::UnknownEnumValue {
                            key: key.to_string(),
                            value,
                        },
                        source => RouteError::InvalidValue {
                            key: key.to_string(),
                            source,
                        },
                    })?;
                    route.apply(key, name, &value, spec, graph, ctx)
                });

            match result {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    warn!(error = %err, "parameter update skipped");
                    report.errors.push(err);
                }
            }
        }

        report
    }
}

/// One remote update batch, in arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterUpdate {
    entries: Vec<(String, ParamValue)>,
}

impl ParameterUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        self.entries.push((key.into(), value.into()));
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Take out every entry matching `keep`, leaving the rest in place.
    pub fn extract(&mut self, mut keep: impl FnMut(&str) -> bool) -> ParameterUpdate {
        let (taken, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|(key, _)| keep(key.as_str()));
        self.entries = rest;
        ParameterUpdate { entries: taken }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ParamValue)> for ParameterUpdate {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for ParameterUpdate {
    type Item = (String, ParamValue);
    type IntoIter = std::vec::IntoIter<(String, ParamValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(feature = "serde")]
impl Serialize for ParameterUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Deserializes from a JSON object, keeping the keys in document order.
#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for ParameterUpdate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UpdateVisitor;

        impl<'de> Visitor<'de> for UpdateVisitor {
            type Value = ParameterUpdate;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an object of parameter values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, ParamValue>()? {
                    entries.push((key, value));
                }
                Ok(ParameterUpdate { entries })
            }
        }

        deserializer.deserialize_map(UpdateVisitor)
    }
}
