//! Running the builder over a template and its descendants.
//!
//! A node runs only after its parent finished, since the parent's image is
//! the child's source. Siblings run concurrently, one task each, and a
//! failing sibling never stops the others.

use std::fmt;
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, FutureExt};
use kiln_common_config::BuilderConfig;
use kiln_common_core::COMPUTED;
use kiln_common_log::spans::{process_span, record_error, template_span, Timer};
use kiln_template::{PlanCompiler, PlanContext, TemplateForest, TemplateId};
use tokio::process::Command;
use tracing::{debug, info, Instrument};

use crate::error::{ExecutorError, Result};
use crate::output::extract_image_id;
use crate::scratch::{Scratch, PLAN_FILE};

/// Builder subcommand to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderCommand {
    Build,
    Validate,
}

impl BuilderCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Build => "build",
            Self::Validate => "validate",
        }
    }

    /// Whether a successful run leaves an image behind.
    pub fn produces_image(self) -> bool {
        matches!(self, Self::Build)
    }
}

impl fmt::Display for BuilderCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the builder lives and where it runs.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    pub binary: PathBuf,
    pub work_dir: PathBuf,
}

impl ExecutorConfig {
    pub fn from_config(config: &BuilderConfig) -> Self {
        Self {
            binary: PathBuf::from(&config.binary),
            work_dir: config.work_dir(),
        }
    }
}

/// Result of one template's run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeOutcome {
    pub template: String,
    /// Set for successful builds.
    pub image_id: Option<String>,
    pub scratch: PathBuf,
}

/// Successful runs of one invocation, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildOutcome {
    nodes: Vec<NodeOutcome>,
}

impl BuildOutcome {
    pub fn nodes(&self) -> &[NodeOutcome] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Image built for `template`, if any.
    pub fn image_id(&self, template: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|node| node.template == template)
            .and_then(|node| node.image_id.as_deref())
    }

    fn extend(&mut self, other: BuildOutcome) {
        self.nodes.extend(other.nodes);
    }
}

impl From<NodeOutcome> for BuildOutcome {
    fn from(node: NodeOutcome) -> Self {
        Self { nodes: vec![node] }
    }
}

struct Shared {
    forest: TemplateForest,
    context: PlanContext,
    config: ExecutorConfig,
}

/// Drives the external builder over a template forest.
///
/// Cloning is cheap; clones share the forest.
#[derive(Clone)]
pub struct BuildExecutor {
    shared: Arc<Shared>,
}

impl BuildExecutor {
    pub fn new(forest: TemplateForest, context: PlanContext, config: ExecutorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                forest,
                context,
                config,
            }),
        }
    }

    pub fn forest(&self) -> &TemplateForest {
        &self.shared.forest
    }

    /// Run `command` for `id`, then, when `recurse` is set, for every
    /// descendant with its parent's image as source.
    ///
    /// Descendants of a validated template get the `<computed>` placeholder
    /// as their source. When any descendant fails the error is
    /// [`ExecutorError::Subtree`], which still lists the runs that succeeded.
    pub async fn run(
        &self,
        id: TemplateId,
        command: BuilderCommand,
        source_ami: Option<String>,
        recurse: bool,
    ) -> Result<BuildOutcome> {
        self.run_node(id, command, source_ami, recurse).await
    }

    fn run_node(
        &self,
        id: TemplateId,
        command: BuilderCommand,
        source_ami: Option<String>,
        recurse: bool,
    ) -> BoxFuture<'static, Result<BuildOutcome>> {
        let this = self.clone();
        let span = template_span(self.forest().get(id).name(), command.as_str());

        async move {
            let result = this.run_tree(id, command, source_ami, recurse).await;
            if let Err(e) = &result {
                record_error(e);
            }
            result
        }
        .instrument(span)
        .boxed()
    }

    async fn run_tree(
        &self,
        id: TemplateId,
        command: BuilderCommand,
        source_ami: Option<String>,
        recurse: bool,
    ) -> Result<BuildOutcome> {
        let node = self.run_self(id, command, source_ami.as_deref()).await?;
        let source = node.image_id.clone().unwrap_or_else(|| COMPUTED.to_string());
        let mut outcome = BuildOutcome::from(node);

        if !recurse {
            return Ok(outcome);
        }

        let mut failures = Vec::new();
        for result in self.run_children(id, command, source).await {
            match result {
                Ok(child) => outcome.extend(child),
                Err(ExecutorError::Subtree {
                    completed,
                    failures: nested,
                    ..
                }) => {
                    outcome.extend(completed);
                    failures.extend(nested);
                }
                Err(e) => failures.push(e),
            }
        }

        if failures.is_empty() {
            Ok(outcome)
        } else {
            Err(ExecutorError::Subtree {
                template: self.forest().get(id).name().to_string(),
                completed: outcome,
                failures,
            })
        }
    }

    /// Start every child of `id` as its own task and wait for all of them.
    async fn run_children(
        &self,
        id: TemplateId,
        command: BuilderCommand,
        source_ami: String,
    ) -> Vec<Result<BuildOutcome>> {
        let children = self.forest().get(id).children().to_vec();
        if children.is_empty() {
            return Vec::new();
        }
        debug!(count = children.len(), source = %source_ami, "Starting children");

        let tasks = children
            .iter()
            .map(|&child| tokio::spawn(self.run_node(child, command, Some(source_ami.clone()), true)));
        let joined = join_all(tasks).await;

        joined
            .into_iter()
            .zip(children)
            .map(|(result, child)| {
                result.unwrap_or_else(|e| {
                    Err(ExecutorError::Aborted {
                        template: self.forest().get(child).name().to_string(),
                        message: e.to_string(),
                    })
                })
            })
            .collect()
    }

    /// Run `command` for `id` alone in a fresh scratch directory.
    pub async fn run_self(
        &self,
        id: TemplateId,
        command: BuilderCommand,
        source_ami: Option<&str>,
    ) -> Result<NodeOutcome> {
        let Shared {
            forest,
            context,
            config,
        } = &*self.shared;
        let template = forest.get(id);
        let name = template.name();

        let plan = PlanCompiler::new(forest, context).plan_self(id, source_ami);
        let scratch = {
            let work_dir = config.work_dir.clone();
            let template_name = name.to_string();
            let template_dir = template.dir().to_path_buf();
            // Blocking filesystem work, root/ may be large.
            tokio::task::spawn_blocking(move || {
                Scratch::prepare(&work_dir, &template_name, &template_dir, &plan)
            })
            .await
            .map_err(|e| ExecutorError::Aborted {
                template: name.to_string(),
                message: e.to_string(),
            })??
        };

        info!(scratch = %scratch.path().display(), "Running {} {}", config.binary.display(), command);
        let timer = Timer::start("builder");
        let status = self
            .invoke(&scratch, command, name)
            .instrument(process_span(
                &config.binary.to_string_lossy(),
                &scratch.path().to_string_lossy(),
            ))
            .await?;
        timer.finish();

        if !status.success() {
            return Err(ExecutorError::NonZeroExit {
                template: name.to_string(),
                status: status.to_string(),
                scratch: scratch.path().to_path_buf(),
            });
        }

        let image_id = if command.produces_image() {
            let log = scratch.stdout_log();
            let output = tokio::fs::read_to_string(&log)
                .await
                .map_err(|e| ExecutorError::io(&log, e))?;
            let id = extract_image_id(&output).ok_or_else(|| ExecutorError::MissingImageId {
                template: name.to_string(),
                log: log.clone(),
            })?;
            info!(image = %id, "Built image");
            Some(id)
        } else {
            None
        };

        Ok(NodeOutcome {
            template: name.to_string(),
            image_id,
            scratch: scratch.path().to_path_buf(),
        })
    }

    async fn invoke(
        &self,
        scratch: &Scratch,
        command: BuilderCommand,
        template: &str,
    ) -> Result<std::process::ExitStatus> {
        let binary = &self.shared.config.binary;
        let stdout_path = scratch.stdout_log();
        let stderr_path = scratch.stderr_log();
        let stdout = File::create(&stdout_path).map_err(|e| ExecutorError::io(&stdout_path, e))?;
        let stderr = File::create(&stderr_path).map_err(|e| ExecutorError::io(&stderr_path, e))?;

        Command::new(binary)
            .arg(command.as_str())
            .arg(PLAN_FILE)
            .current_dir(scratch.path())
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .status()
            .await
            .map_err(|source| ExecutorError::Spawn {
                template: template.to_string(),
                binary: binary.clone(),
                source,
            })
    }
}
