//! Build plan compilation.
//!
//! A plan is the fully resolved input the external builder consumes: the
//! merged builder configuration, the provisioners and the variables of one
//! template.

use kiln_common_core::{BuildStamp, COMPUTED};
use serde::{Deserialize, Serialize};

use crate::scripts::{self, BEGIN_SCRIPT_NAME, END_SCRIPT_NAME, REMOTE_UPLOAD_DIR, ROOT_DIR};
use crate::template::{TemplateForest, TemplateId};
use crate::value::{Settings, Value};

/// Builder keys stamped or filled in by the compiler.
pub mod keys {
    pub const SOURCE_AMI: &str = "source_ami";
    pub const REGION: &str = "region";
    pub const TYPE: &str = "type";
    pub const NAME: &str = "name";
    pub const AMI_NAME: &str = "ami_name";
}

/// Builder type used when none is configured.
pub const DEFAULT_BUILDER_TYPE: &str = "amazon-ebs";

/// Invocation-wide inputs to plan compilation.
///
/// Established once at process entry so every plan of one invocation shares
/// the same stamp and region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanContext {
    pub stamp: BuildStamp,
    /// Filled into builders whose configuration names no region.
    pub region: Option<String>,
    pub builder_type: String,
}

impl PlanContext {
    pub fn new(stamp: BuildStamp) -> Self {
        Self {
            stamp,
            region: None,
            builder_type: DEFAULT_BUILDER_TYPE.to_string(),
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_builder_type(mut self, builder_type: impl Into<String>) -> Self {
        self.builder_type = builder_type.into();
        self
    }

    /// Name given to the image built from `template`.
    pub fn ami_name(&self, template: &str) -> String {
        format!("{template}/{}", self.stamp)
    }
}

/// A provisioner entry of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Provisioner {
    File {
        source: String,
        destination: String,
    },
    Shell {
        scripts: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        execute_command: Option<String>,
    },
}

/// The plan for one template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub builders: Vec<Settings>,
    pub provisioners: Vec<Provisioner>,
    pub variables: Settings,
}

impl PlanDocument {
    /// The single builder configuration.
    pub fn builder(&self) -> &Settings {
        &self.builders[0]
    }

    /// Pretty JSON with every object's keys sorted.
    pub fn to_json_pretty(&self) -> kiln_common_core::Result<String> {
        to_sorted_json(self)
    }
}

/// One plan, or a subtree's plans in breadth-first order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Plan {
    Single(PlanDocument),
    Tree(Vec<PlanDocument>),
}

impl Plan {
    pub fn documents(&self) -> &[PlanDocument] {
        match self {
            Plan::Single(doc) => std::slice::from_ref(doc),
            Plan::Tree(docs) => docs,
        }
    }

    pub fn to_json_pretty(&self) -> kiln_common_core::Result<String> {
        to_sorted_json(self)
    }
}

// serde_json's map is ordered by key, so a round trip through `Value`
// sorts struct fields and enum tags along with the maps.
fn to_sorted_json<T: Serialize>(value: &T) -> kiln_common_core::Result<String> {
    let value = serde_json::to_value(value)
        .map_err(|e| kiln_common_core::Error::serialization(e.to_string()))?;
    serde_json::to_string_pretty(&value)
        .map_err(|e| kiln_common_core::Error::serialization(e.to_string()))
}

/// Compiles plans for templates of one forest.
#[derive(Debug, Clone, Copy)]
pub struct PlanCompiler<'a> {
    forest: &'a TemplateForest,
    context: &'a PlanContext,
}

impl<'a> PlanCompiler<'a> {
    pub fn new(forest: &'a TemplateForest, context: &'a PlanContext) -> Self {
        Self { forest, context }
    }

    pub fn forest(&self) -> &'a TemplateForest {
        self.forest
    }

    pub fn context(&self) -> &'a PlanContext {
        self.context
    }

    /// Resolved builder configuration of `id`.
    ///
    /// Ancestor `ami` maps are overlaid top-down, nearest winning per key.
    /// `source_ami` is never inherited: each level starts from the
    /// placeholder, and an explicit `source_ami` replaces whatever resolved.
    pub fn builders(&self, id: TemplateId, source_ami: Option<&str>) -> Settings {
        let mut builder = Settings::new();

        for ancestor in self.forest.lineage(id) {
            builder.insert(keys::SOURCE_AMI.to_string(), Value::from(COMPUTED));
            if let Some(ami) = self.forest.get(ancestor).ami() {
                for (key, value) in ami {
                    builder.insert(key.clone(), value.clone());
                }
            }
        }

        if !builder.contains_key(keys::REGION) {
            if let Some(region) = &self.context.region {
                builder.insert(keys::REGION.to_string(), Value::from(region.as_str()));
            }
        }

        if let Some(source) = source_ami {
            builder.insert(keys::SOURCE_AMI.to_string(), Value::from(source));
        }

        let name = self.forest.get(id).name();
        builder.insert(keys::TYPE.to_string(), Value::from(self.context.builder_type.as_str()));
        builder.insert(keys::NAME.to_string(), Value::from(name));
        builder.insert(keys::AMI_NAME.to_string(), Value::from(self.context.ami_name(name)));
        builder
    }

    /// File upload of the static tree, then the shell scripts.
    pub fn provisioners(&self, id: TemplateId) -> Vec<Provisioner> {
        let template = self.forest.get(id);

        let mut scripts = Vec::with_capacity(template.scripts().len() + 2);
        scripts.push(BEGIN_SCRIPT_NAME.to_string());
        scripts.extend(template.scripts().iter().map(|s| scripts::script_path(s)));
        scripts.push(END_SCRIPT_NAME.to_string());

        vec![
            Provisioner::File {
                source: ROOT_DIR.to_string(),
                destination: REMOTE_UPLOAD_DIR.to_string(),
            },
            Provisioner::Shell {
                scripts,
                execute_command: self.forest.execute_command(id).map(str::to_string),
            },
        ]
    }

    /// Plan for `id` alone.
    pub fn plan_self(&self, id: TemplateId, source_ami: Option<&str>) -> PlanDocument {
        PlanDocument {
            builders: vec![self.builders(id, source_ami)],
            provisioners: self.provisioners(id),
            variables: self.forest.variables(id),
        }
    }

    /// Plan for `id`, or for `id` and all its descendants breadth-first.
    ///
    /// When recursing, `source_ami` only applies to `id`; descendants keep
    /// the placeholder since their source is produced by their parent's
    /// build.
    pub fn plan(&self, id: TemplateId, source_ami: Option<&str>, recurse: bool) -> Plan {
        if !recurse {
            return Plan::Single(self.plan_self(id, source_ami));
        }

        let docs = self
            .forest
            .breadth_first(id)
            .into_iter()
            .map(|node| {
                let source = if node == id { source_ami } else { None };
                self.plan_self(node, source)
            })
            .collect();
        Plan::Tree(docs)
    }
}
