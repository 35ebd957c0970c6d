use std::sync::Arc;

use tracing::info;
use travel_agent_workflow::travel::DEFAULT_REQUESTS;
use travel_agent_workflow::{config, setup_agents, setup_telemetry, OpenAIProvider};

#[tokio::main]
async fn main() -> travel_agent_workflow::Result<()> {
    let config = config::load()?;
    let telemetry = setup_telemetry(&config)?;
    let workflow = setup_agents(Arc::new(OpenAIProvider::new()), telemetry, &config)?;

    for request in DEFAULT_REQUESTS {
        let output = workflow.run(request).await?;
        info!(trace_id = %output.trace_id, agent = %output.agent, "Request handled");
        println!("{}", output);
    }

    Ok(())
}
