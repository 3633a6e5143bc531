use modflow::nodes::{Gain, Mixer, Print, SineGenerator, SignalFrame};
use modflow::{ConfigReader, ExecutionMode, ModuleFactory};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
name: SignalChain
shared_parameters:
  sample_rate: ${SAMPLE_RATE}
  frame_size: 256
modules:
  - name: low
    type: SineGenerator
    parameters: {frequency: 220}
    group: sources
  - name: high
    type: SineGenerator
    parameters: {frequency: ${HIGH_FREQUENCY}, amplitude: 0.5}
    group: sources
  - name: mix
    type: Mixer
    depends_on: [low, high]
    expose: mixed
  - name: amplifier
    type: Gain
    parameters: {gain: 2.5}
    depends_on: [mix]
    expose: true
  - name: console_out
    type: Print
    parameters: {label: Final Output}
    depends_on: [amplifier]
"#;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut factory = ModuleFactory::new();
    factory
        .register::<SineGenerator>("SineGenerator")
        .register::<Gain>("Gain")
        .register::<Mixer>("Mixer")
        .register::<Print>("Print");

    let parameters = serde_yaml::from_str("{SAMPLE_RATE: 48000, HIGH_FREQUENCY: 880}")?;
    let mut pipeline = ConfigReader::read(CONFIG, &factory, Some(parameters), None)
        .await?
        .with_execution_mode(ExecutionMode::Parallel);

    for i in 0..3 {
        println!("--- Run {} ---", i + 1);
        let (results, report) = pipeline.run().await?;

        for (label, payload) in &results {
            let frame = SignalFrame::from_payload(payload)?;
            println!("{label}: {} samples", frame.samples.len());
        }
        println!("run took {:?}", report.elapsed);
    }

    for (module, snapshot) in pipeline.metrics().snapshot() {
        println!(
            "{module}: {} runs, {} errors, avg {}us, max {}us",
            snapshot.runs, snapshot.errors_count, snapshot.avg_latency_us, snapshot.max_latency_us
        );
    }

    Ok(())
}
