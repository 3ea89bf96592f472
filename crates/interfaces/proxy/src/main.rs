use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use aws_config::{BehaviorVersion, Region};
use lambda_runtime::{Error, LambdaEvent, run, service_fn};
use tracing::{info, warn};

use docsum_agentcore::{RuntimeClient, SERVICE_NAME, SignedClient};
use docsum_config::{AppConfig, ProxyConfig};
use docsum_proxy::{
    AgentCoreRuntimeInvoker, HttpRuntimeInvoker, RuntimeInvoker, S3EventNotification, handle_event,
};

async fn build_invoker(config: &AppConfig) -> anyhow::Result<Arc<dyn RuntimeInvoker>> {
    let proxy: &ProxyConfig = &config.proxy;
    let timeout = Duration::from_secs(proxy.timeout_secs);

    if !proxy.runtime_endpoint.trim().is_empty() {
        let invoker = HttpRuntimeInvoker::new(&proxy.runtime_endpoint, timeout)?;
        info!(url = %invoker.url(), "forwarding to runtime over HTTP");
        return Ok(Arc::new(invoker));
    }
    if proxy.runtime_arn.trim().is_empty() {
        bail!("set AGENTCORE_RUNTIME_ARN or AGENTCORE_RUNTIME_ENDPOINT");
    }

    let sdk = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.aws.region.clone()))
        .load()
        .await;
    let signed = SignedClient::new(&sdk, SERVICE_NAME)
        .with_timeout(timeout)
        .context("failed to build AgentCore client")?;
    info!(runtime_arn = %proxy.runtime_arn, qualifier = %proxy.qualifier, "forwarding to AgentCore runtime");
    Ok(Arc::new(AgentCoreRuntimeInvoker::new(
        RuntimeClient::new(signed),
        proxy.runtime_arn.clone(),
        proxy.qualifier.clone(),
    )))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = AppConfig::from_env()?;
    config.telemetry.init_tracing();
    for warning in config.warnings() {
        warn!("{warning}");
    }

    let invoker = build_invoker(&config).await?;
    let mode = config.proxy.mode;

    run(service_fn(move |event: LambdaEvent<S3EventNotification>| {
        let invoker = invoker.clone();
        async move { Ok::<_, Error>(handle_event(&event.payload, invoker.as_ref(), mode).await) }
    }))
    .await
}
