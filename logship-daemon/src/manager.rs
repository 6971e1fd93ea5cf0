//! Component wiring and lifecycle management.
//!
//! The [`Manager`] is the central coordinator of `logship-daemon`.
//! It builds the shared filter chain once, builds every output sender and
//! every listener from the configuration, connects every sender to every
//! listener and drives the ordered startup and shutdown.
//!
//! # Startup Order (consumers before producers)
//!
//! 1. Output senders (delivery loops running, queues ready)
//! 2. Listeners (begin emitting events)
//!
//! # Shutdown Order (producers first)
//!
//! 1. Listeners (stop emitting events)
//! 2. Output senders (cancel delivery loops, count leftovers as lost)

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use logship_core::config::{LogshipConfig, OutputConfig, OutputKind};
use logship_core::metrics as m;
use logship_core::pipeline::{DynPipeline, Listener, Output, OutputStats};
use logship_pipeline::{
    ConsoleTransport, FilterChain, OutputSender, PatternResolver, RedisTransport, StartupMetadata,
    build_listener,
};

use crate::health::{ComponentHealth, ComponentKind, DaemonHealth, aggregate_status};
use crate::metrics_server;

/// The main daemon manager.
pub struct Manager {
    /// Loaded and validated configuration.
    config: LogshipConfig,
    /// Host identity stamped on events and startup metadata.
    hostname: String,
    /// Filter chain shared by every output.
    chain: Arc<FilterChain>,
    /// Output senders in configuration order.
    outputs: Vec<Box<dyn Output>>,
    /// Listeners in configuration order.
    inputs: Vec<Box<dyn Listener>>,
    /// Root cancellation signal; every component holds a child token.
    root: CancellationToken,
    /// Manager build time (for uptime reporting).
    start_time: Instant,
    /// Whether `start` completed.
    running: bool,
}

impl Manager {
    /// Load configuration from a file and build the manager.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = LogshipConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Resolves every pattern and condition, then wires listeners to outputs.
    /// Sockets are not bound until [`Manager::start`].
    pub fn build_from_config(config: LogshipConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
        }

        let hostname = config.general.resolved_hostname();
        let resolver = PatternResolver::with_patterns(config.patterns.clone());
        let chain = Arc::new(
            FilterChain::from_configs(&config.filters, &resolver)
                .map_err(|e| anyhow::anyhow!("failed to build filter chain: {}", e))?,
        );
        tracing::info!(filters = ?chain.names(), "filter chain built");

        let root = CancellationToken::new();
        let mut manager = Self {
            hostname,
            chain,
            outputs: Vec::new(),
            inputs: Vec::new(),
            root,
            start_time: Instant::now(),
            running: false,
            config,
        };

        for output in manager.config.outputs.clone() {
            let sender = manager.build_output(output)?;
            manager.add_output(sender)?;
        }
        for input in manager.config.inputs.clone() {
            let listener = build_listener(&input, &manager.hostname, manager.root.child_token());
            manager.add_input(listener)?;
        }

        tracing::info!(
            inputs = manager.inputs.len(),
            outputs = manager.outputs.len(),
            hostname = %manager.hostname,
            "manager initialized"
        );
        Ok(manager)
    }

    fn build_output(&self, config: OutputConfig) -> Result<Box<dyn Output>> {
        let name = config.name.clone();
        let metadata = StartupMetadata::new(self.hostname.clone(), name.clone());
        let cancel = self.root.child_token();
        let chain = Arc::clone(&self.chain);

        let output: Box<dyn Output> = match config.kind {
            OutputKind::Redis => {
                let sender = OutputSender::new(config, chain, RedisTransport::new(), cancel)
                    .map_err(|e| anyhow::anyhow!("failed to build output '{}': {}", name, e))?;
                sender.startup(&metadata);
                Box::new(sender)
            }
            OutputKind::Stdout => {
                let sender = OutputSender::new(config, chain, ConsoleTransport::stdout(), cancel)
                    .map_err(|e| anyhow::anyhow!("failed to build output '{}': {}", name, e))?;
                sender.startup(&metadata);
                Box::new(sender)
            }
        };
        Ok(output)
    }

    /// Register an extra output and connect it to every existing listener.
    pub fn add_output(&mut self, output: Box<dyn Output>) -> Result<()> {
        self.ensure_not_running()?;
        for input in &mut self.inputs {
            output.connect(input.as_mut());
        }
        self.outputs.push(output);
        Ok(())
    }

    /// Register an extra listener and connect every existing output to it.
    pub fn add_input(&mut self, mut input: Box<dyn Listener>) -> Result<()> {
        self.ensure_not_running()?;
        for output in &self.outputs {
            output.connect(input.as_mut());
        }
        self.inputs.push(input);
        Ok(())
    }

    fn ensure_not_running(&self) -> Result<()> {
        if self.running {
            return Err(anyhow::anyhow!(
                "components must be registered before the manager starts"
            ));
        }
        Ok(())
    }

    /// Start every output, then every listener.
    ///
    /// If any component fails to start, the ones already started are stopped
    /// again and the error is returned.
    pub async fn start(&mut self) -> Result<()> {
        self.ensure_not_running()?;

        for idx in 0..self.outputs.len() {
            if let Err(e) = self.outputs[idx].start().await {
                let name = self.outputs[idx].name().to_owned();
                tracing::error!(output = %name, error = %e, "output failed to start, rolling back");
                self.rollback(0, idx).await;
                return Err(anyhow::anyhow!("failed to start output '{}': {}", name, e));
            }
        }

        for idx in 0..self.inputs.len() {
            if let Err(e) = self.inputs[idx].start().await {
                let name = self.inputs[idx].name().to_owned();
                tracing::error!(input = %name, error = %e, "input failed to start, rolling back");
                self.rollback(idx, self.outputs.len()).await;
                return Err(anyhow::anyhow!("failed to start input '{}': {}", name, e));
            }
        }

        self.running = true;
        tracing::info!(
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            "all components started"
        );
        Ok(())
    }

    /// Stop the first `inputs` listeners and the first `outputs` senders.
    async fn rollback(&mut self, inputs: usize, outputs: usize) {
        for input in self.inputs[..inputs].iter_mut().rev() {
            if let Err(e) = input.stop().await {
                tracing::warn!(input = %input.name(), error = %e, "rollback stop failed");
            }
        }
        for output in self.outputs[..outputs].iter_mut().rev() {
            if let Err(e) = output.stop().await {
                tracing::warn!(output = %output.name(), error = %e, "rollback stop failed");
            }
        }
        self.root.cancel();
    }

    /// Stop every listener, then every output, then cancel the root token.
    ///
    /// Every component is asked to stop even if an earlier one fails; the
    /// first failure is returned.
    pub async fn stop(&mut self) -> Result<()> {
        if !self.running {
            return Err(anyhow::anyhow!("manager is not running"));
        }
        self.running = false;

        let mut first_error = None;
        for input in self.inputs.iter_mut().rev() {
            if let Err(e) = input.stop().await {
                tracing::error!(input = %input.name(), error = %e, "failed to stop input");
                first_error.get_or_insert_with(|| format!("input '{}': {}", input.name(), e));
            }
        }
        for output in self.outputs.iter_mut().rev() {
            if let Err(e) = output.stop().await {
                tracing::error!(output = %output.name(), error = %e, "failed to stop output");
                first_error.get_or_insert_with(|| format!("output '{}': {}", output.name(), e));
            }
            let stats = output.stats();
            tracing::info!(
                output = %output.name(),
                delivered = stats.delivered,
                lost = stats.lost,
                "output final stats"
            );
        }
        self.root.cancel();
        self.publish_stats();

        match first_error {
            Some(reason) => Err(anyhow::anyhow!("shutdown incomplete: {}", reason)),
            None => {
                tracing::info!("all components stopped");
                Ok(())
            }
        }
    }

    /// Start, publish statistics periodically until `shutdown` resolves, then stop.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;

        let period = Duration::from_secs(self.config.metrics.report_interval_secs.max(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = self.root.cancelled() => {
                    tracing::info!("root cancellation observed");
                    break;
                }
                _ = ticker.tick() => self.publish_stats(),
            }
        }

        self.stop().await
    }

    /// Publish every output's statistics and the daemon gauges.
    pub fn publish_stats(&self) {
        for output in &self.outputs {
            let stats = output.stats();
            metrics_server::publish_output_stats(output.name(), &stats);
            tracing::debug!(
                output = %output.name(),
                received = stats.received,
                delivered = stats.delivered,
                lost = stats.lost,
                queue_len = stats.queue_len,
                "output stats"
            );
        }

        let running = |n: usize| if self.running { n as f64 } else { 0.0 };
        metrics::gauge!(m::DAEMON_INPUTS_RUNNING).set(running(self.inputs.len()));
        metrics::gauge!(m::DAEMON_OUTPUTS_RUNNING).set(running(self.outputs.len()));
        #[allow(clippy::cast_precision_loss)]
        metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(self.start_time.elapsed().as_secs() as f64);
    }

    /// Current aggregated health.
    pub async fn health(&self) -> DaemonHealth {
        let mut components = Vec::with_capacity(self.inputs.len() + self.outputs.len());
        for input in &self.inputs {
            components.push(ComponentHealth {
                name: input.name().to_owned(),
                kind: ComponentKind::Input,
                status: input.health_check().await,
            });
        }
        for output in &self.outputs {
            components.push(ComponentHealth {
                name: output.name().to_owned(),
                kind: ComponentKind::Output,
                status: output.health_check().await,
            });
        }

        DaemonHealth {
            status: aggregate_status(&components),
            uptime_secs: self.start_time.elapsed().as_secs(),
            components,
        }
    }

    /// Statistics snapshot of every output.
    pub fn output_stats(&self) -> Vec<(String, OutputStats)> {
        self.outputs
            .iter()
            .map(|o| (o.name().to_owned(), o.stats()))
            .collect()
    }

    /// Names of the registered listeners.
    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|i| i.name()).collect()
    }

    /// Names of the registered outputs.
    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.name()).collect()
    }

    /// The shared filter chain.
    pub fn chain(&self) -> &Arc<FilterChain> {
        &self.chain
    }

    /// Host identity used for events and startup metadata.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Root cancellation token. Child tokens go to extra components.
    pub fn root_token(&self) -> &CancellationToken {
        &self.root
    }

    /// Whether `start` has completed and `stop` has not.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The loaded configuration.
    pub fn config(&self) -> &LogshipConfig {
        &self.config
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
pub async fn wait_for_shutdown_signal() -> Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

        Ok(tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        })
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("failed to install Ctrl-C handler: {}", e))?;
        Ok("CTRL_C")
    }
}
