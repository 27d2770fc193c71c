use std::error::Error;
use std::io::{self, BufRead, BufReader, Write};
use std::net::TcpStream;
use std::sync::{mpsc, Arc};
use std::thread;

use chrono::Utc;
use clap::Parser;

use meshbot_weather::alerts::AlertMonitor;
use meshbot_weather::cache::WeatherDataCache;
use meshbot_weather::config::Settings;
use meshbot_weather::duty::DutyCycleGuard;
use meshbot_weather::nws::{GridForecast, NwsClient, PointAlerts};
use meshbot_weather::report::Report;
use meshbot_weather::router::CommandRouter;
use meshbot_weather::transport::{read_frames, InboundMessage, JsonLinesTransport, Outbox, Transport};

mod cli;

use crate::cli::Args;

enum Event {
    Inbound(InboundMessage),
    Closed,
    Shutdown,
}

type Bridge = (Box<dyn BufRead + Send>, Box<dyn Write + Send>);

fn connect(host: Option<&str>) -> io::Result<Bridge> {
    match host {
        Some(host) => {
            let stream = TcpStream::connect(host)?;
            log::info!("Connected to radio bridge at {host}");
            Ok((Box::new(BufReader::new(stream.try_clone()?)), Box::new(stream)))
        }
        None => Ok((Box::new(BufReader::new(io::stdin())), Box::new(io::stdout()))),
    }
}

fn lookup(client: Arc<NwsClient>, lat: f64, lon: f64, report: Report) -> Result<(), Box<dyn Error>> {
    let weather = WeatherDataCache::for_coordinates(client, lat, lon)?;
    for message in report.render(&weather, Utc::now()) {
        println!("{message}\n");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let settings = Settings::load(&args.config).inspect_err(|e| log::error!("{}: {e}", args.config))?;
    let client = Arc::new(NwsClient::new(&settings.user_agent(), settings.http_timeout())?);

    if let (Some((lat, lon)), Some(report)) = (args.lookup, args.report) {
        return lookup(client, lat, lon, report.into());
    }

    let my_node = args.node_id.clone().or_else(|| settings.node_id.clone());
    match &my_node {
        Some(node) => log::info!("Bot node id is {node}"),
        None if settings.dm_mode => {
            return Err("DM_MODE is enabled but no node id is known; set NODE_ID or pass --node-id".into());
        }
        None => log::warn!("No node id known; every message is treated as a broadcast"),
    }

    let settings = Arc::new(settings);
    let (reader, writer) = connect(args.host.as_deref())?;
    let transport: Arc<dyn Transport> = Arc::new(JsonLinesTransport::new(writer));
    let outbox = Arc::new(Outbox::new(transport, settings.pacing()));

    let weather = Arc::new(WeatherDataCache::new(GridForecast::new(
        Arc::clone(&client),
        settings.grid(),
    )));
    let alerts = Arc::new(AlertMonitor::new(
        PointAlerts::new(client, settings.alert_lat, settings.alert_lon),
        Arc::clone(&outbox),
        settings.alert_options(),
    ));
    if !weather.force_refresh() {
        log::warn!("Starting without a complete forecast; will retry on first request");
    }
    let duty = Arc::new(DutyCycleGuard::new(settings.duty_cycle));
    log::info!("Duty cycle enforcement {}", if duty.enforced() { "on" } else { "off" });

    let (decay, cooldown) = duty.spawn_timers()?;
    let alert_poll = alerts.spawn_polling(settings.alert_interval())?;
    log::info!(
        "Monitoring alerts for ({}, {}) every {}s",
        settings.alert_lat,
        settings.alert_lon,
        settings.alert_check_interval
    );

    let router = Arc::new(CommandRouter::new(
        Arc::clone(&settings),
        my_node,
        weather,
        alerts,
        duty,
        outbox,
    ));

    let (events, inbox) = mpsc::channel();
    let interrupt = events.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt.send(Event::Shutdown);
    })?;
    thread::Builder::new().name("bridge-reader".to_string()).spawn(move || {
        read_frames(reader, |message| events.send(Event::Inbound(message)).is_ok());
        let _ = events.send(Event::Closed);
    })?;

    log::info!("Meshbot weather is running");
    for event in inbox {
        match event {
            Event::Inbound(message) => {
                let router = Arc::clone(&router);
                let spawned = thread::Builder::new()
                    .name("command".to_string())
                    .spawn(move || {
                        router.handle(&message);
                    });
                if let Err(e) = spawned {
                    log::error!("Unable to handle incoming message: {e}");
                }
            }
            Event::Closed => {
                log::warn!("Radio bridge closed the connection");
                break;
            }
            Event::Shutdown => {
                log::info!("Initiating shutdown...");
                break;
            }
        }
    }

    alert_poll.stop();
    decay.stop();
    cooldown.stop();
    log::info!("Shutdown complete");
    Ok(())
}
