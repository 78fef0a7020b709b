//! Step registry.
//!
//! Maps step names to factories that build an unconfigured step from JSON
//! parameters. The built-in steps are registered by
//! [`StepRegistry::with_builtin`]; applications can add their own.

use crate::error::{FlowError, FlowResult};
use crate::step::TraceStep;
use crate::steps::{
    convolution, designature, resample, ConvolutionParams, ConvolutionStep, DesignatureParams,
    DesignatureStep, ResampleParams, ResampleStep,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

/// Builds a step from its parameters.
pub type StepFactory = Box<dyn Fn(&Value) -> FlowResult<Box<dyn TraceStep>> + Send + Sync>;

/// Named step factories.
pub struct StepRegistry {
    factories: BTreeMap<String, StepFactory>,
}

impl StepRegistry {
    /// Registry without any steps.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Registry with the designature, resample and convolution steps.
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        registry.register(designature::NAME, |params| {
            let params: DesignatureParams = decode(designature::NAME, params)?;
            Ok(Box::new(DesignatureStep::new(params)))
        });
        registry.register(resample::NAME, |params| {
            let params: ResampleParams = decode(resample::NAME, params)?;
            Ok(Box::new(ResampleStep::new(params)))
        });
        registry.register(convolution::NAME, |params| {
            let params: ConvolutionParams = decode(convolution::NAME, params)?;
            Ok(Box::new(ConvolutionStep::new(params)))
        });
        registry
    }

    /// Register a factory, replacing any previous one with the same name.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Value) -> FlowResult<Box<dyn TraceStep>> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.insert(name.clone(), Box::new(factory)).is_some() {
            tracing::warn!(step = %name, "step factory replaced");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    /// Build an unconfigured step.
    pub fn create(&self, name: &str, params: &Value) -> FlowResult<Box<dyn TraceStep>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| FlowError::UnknownStep(name.to_string()))?;
        factory(params)
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn decode<T: DeserializeOwned>(step: &str, params: &Value) -> FlowResult<T> {
    T::deserialize(params).map_err(|e| FlowError::invalid_parameter(step, e.to_string()))
}
