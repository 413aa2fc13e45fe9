//! velo: find bike-share stations and point at them.

mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use output::Status;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use velo_geo::{rank_by_distance, CompassPoint, Coordinate, NavigationResult};
use velo_navigation::{
    CompassService, LocationErrorKind, NavigationSession, OrientationFeed, OrientationReading,
    OrientationSample, Pointer, PositionFeed, WatchOptions,
};
use velo_network::{CitybikesClient, ClientConfig, Network, NetworkError, Station};

#[derive(Parser)]
#[command(name = "velo")]
#[command(about = "Find bike-share stations and point at them")]
#[command(version)]
struct Cli {
    /// Network id on citybik.es
    #[arg(long, global = true, env = "VELO_NETWORK")]
    network: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stations, optionally filtered and sorted by distance
    Stations {
        /// Only stations whose name or address contains this
        #[arg(short, long)]
        search: Option<String>,
        /// Sort by distance from "LAT,LON"
        #[arg(long, allow_hyphen_values = true)]
        near: Option<Coordinate>,
        /// Show at most this many stations
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one station
    Station {
        /// Station id
        id: String,
        /// Your position as "LAT,LON"
        #[arg(long, allow_hyphen_values = true)]
        from: Option<Coordinate>,
        /// Device compass heading in degrees
        #[arg(long, requires = "from", allow_hyphen_values = true, value_parser = parse_heading)]
        heading: Option<f64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Distance and bearing between two points (offline)
    Distance {
        /// Start as "LAT,LON"
        #[arg(allow_hyphen_values = true)]
        from: Coordinate,
        /// Destination as "LAT,LON"
        #[arg(allow_hyphen_values = true)]
        to: Coordinate,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Follow a station while reading positions from stdin
    ///
    /// Each line is "LAT,LON" or "LAT,LON,HEADING"; "error:denied",
    /// "error:unavailable" and "error:timeout" simulate provider failures.
    Track {
        /// Station id
        #[arg(required_unless_present = "to", conflicts_with = "to")]
        id: Option<String>,
        /// Track a fixed point instead of a station (offline)
        #[arg(long, allow_hyphen_values = true)]
        to: Option<Coordinate>,
        /// Output one JSON object per line
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    velo_telemetry::init_with_config(velo_telemetry::TelemetryConfig::for_verbosity(cli.verbose))?;

    match cli.command {
        Commands::Stations { search, near, limit, json } => {
            let network = fetch_network(cli.network.as_deref()).await?;
            list_stations(&network, search.as_deref(), near, limit, json)?;
        }

        Commands::Station { id, from, heading, json } => {
            let network = fetch_network(cli.network.as_deref()).await?;
            let station = match network.require_station(&id) {
                Ok(station) => station,
                Err(e @ NetworkError::TargetNotFound(_)) => {
                    Status::error(&e.to_string());
                    std::process::exit(1);
                }
                Err(e) => return Err(e.into()),
            };

            let pointer = from.map(|from| pointer_to(&from, &station.coordinate(), heading));
            if json {
                let value = serde_json::json!({
                    "station": station,
                    "status": station.status(),
                    "address": station.address_or_default(),
                    "capacity_ratio": station.capacity_ratio(),
                    "pointer": pointer,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                output::print_station_card(station, pointer.as_ref());
            }
        }

        Commands::Distance { from, to, json } => {
            let result = NavigationResult::between(&from, &to);
            let point = CompassPoint::from_bearing(result.bearing_degrees);
            if json {
                let value = serde_json::json!({
                    "from": from,
                    "to": to,
                    "distance_km": result.distance_km,
                    "distance_label": result.distance_label(),
                    "bearing_degrees": result.bearing_degrees,
                    "compass_point": point,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "{} {} ({:.1}°)",
                    result.distance_label(),
                    point,
                    result.bearing_degrees
                );
            }
        }

        Commands::Track { id, to, json } => {
            let target = match (to, id) {
                (Some(to), _) => to,
                (None, Some(id)) => {
                    let network = fetch_network(cli.network.as_deref()).await?;
                    match network.require_station(&id) {
                        Ok(station) => station.coordinate(),
                        Err(e @ NetworkError::TargetNotFound(_)) => {
                            Status::error(&e.to_string());
                            std::process::exit(1);
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                (None, None) => anyhow::bail!("either a station id or --to is required"),
            };
            track(target, json).await?;
        }
    }

    Ok(())
}

async fn fetch_network(network: Option<&str>) -> anyhow::Result<Network> {
    let mut config = ClientConfig::from_env()?;
    if let Some(network) = network {
        config = config.with_network(network);
    }

    let client = CitybikesClient::with_config(config)?;
    client
        .fetch_network()
        .await
        .context("Failed to load the station network")
}

fn list_stations(
    network: &Network,
    search: Option<&str>,
    near: Option<Coordinate>,
    limit: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let matches: Vec<Station> = network
        .search(search.unwrap_or_default())
        .into_iter()
        .cloned()
        .collect();

    let rows: Vec<(&Station, Option<f64>)> = match near {
        Some(origin) => rank_by_distance(&origin, &matches, limit)
            .into_iter()
            .map(|ranked| (ranked.item, Some(ranked.distance_km)))
            .collect(),
        None => matches
            .iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|s| (s, None))
            .collect(),
    };
    debug!(matched = matches.len(), shown = rows.len(), "Stations selected");

    if json {
        let value: Vec<_> = rows
            .iter()
            .map(|(station, distance_km)| {
                serde_json::json!({
                    "station": station,
                    "status": station.status(),
                    "distance_km": distance_km,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let name = network.location.as_ref().map_or(network.name.clone(), |l| {
        format!("{} · {}", network.name, l.city)
    });
    Status::header(&format!("{name} · {} bikes available", network.total_free_bikes()));
    if rows.is_empty() {
        Status::warning("No stations match");
    }
    for (station, distance_km) in rows {
        output::print_station_line(station, distance_km);
    }
    Ok(())
}

/// Pointer for a one-off position, optionally rotated by a compass heading.
fn pointer_to(from: &Coordinate, to: &Coordinate, heading: Option<f64>) -> Pointer {
    let sample = heading.and_then(|h| OrientationSample::from_reading(OrientationReading::CompassHeading(h)));
    Pointer::new(NavigationResult::between(from, to), sample)
}

/// A finite heading in degrees.
fn parse_heading(s: &str) -> Result<f64, String> {
    let heading: f64 = s.trim().parse().map_err(|e| format!("'{}': {e}", s.trim()))?;
    if heading.is_finite() {
        Ok(heading)
    } else {
        Err(format!("heading must be a finite number of degrees, got '{}'", s.trim()))
    }
}

enum TrackLine {
    Fix(Coordinate, Option<f64>),
    Failure(LocationErrorKind),
}

fn parse_track_line(line: &str) -> anyhow::Result<TrackLine> {
    if let Some(kind) = line.strip_prefix("error:") {
        let kind = match kind.trim() {
            "denied" => LocationErrorKind::PermissionDenied,
            "unavailable" => LocationErrorKind::PositionUnavailable,
            "timeout" => LocationErrorKind::Timeout,
            other => anyhow::bail!("unknown error kind '{other}'"),
        };
        return Ok(TrackLine::Failure(kind));
    }

    let mut parts = line.splitn(3, ',');
    let (Some(lat), Some(lon)) = (parts.next(), parts.next()) else {
        anyhow::bail!("expected 'LAT,LON[,HEADING]'");
    };
    let coordinate: Coordinate = format!("{lat},{lon}").parse()?;
    let heading = parts
        .next()
        .map(parse_heading)
        .transpose()
        .map_err(anyhow::Error::msg)?;
    Ok(TrackLine::Fix(coordinate, heading))
}

async fn track(target: Coordinate, json: bool) -> anyhow::Result<()> {
    let positions = PositionFeed::new();
    let orientation = OrientationFeed::new();
    let compass = CompassService::new(orientation.clone());

    let mut session = NavigationSession::with_options(positions.clone(), compass, WatchOptions::from_env());
    session.compass().request_permission();
    session.set_target(target);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_track_line(line) {
            Ok(TrackLine::Fix(coordinate, heading)) => {
                if let Some(heading) = heading {
                    orientation.push(OrientationReading::CompassHeading(heading));
                }
                if positions.push(coordinate) == 0 {
                    debug!("No live watch, fix dropped");
                }
            }
            Ok(TrackLine::Failure(kind)) => {
                positions.push_error(kind);
            }
            Err(e) => {
                warn!(line = %line, error = %e, "Skipping malformed line");
                continue;
            }
        }

        let state = session.pump();
        if json {
            println!("{}", serde_json::to_string(&state)?);
        } else {
            println!("{}", output::pointer_line(&state));
        }
    }

    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_line() {
        match parse_track_line("51.2194, 4.4025").unwrap() {
            TrackLine::Fix(c, None) => assert_eq!(c, Coordinate::new(51.2194, 4.4025)),
            _ => panic!("expected a fix"),
        }
        match parse_track_line("51.2194,4.4025,90").unwrap() {
            TrackLine::Fix(_, Some(h)) => assert_eq!(h, 90.0),
            _ => panic!("expected a fix with heading"),
        }
        assert!(matches!(
            parse_track_line("error:timeout").unwrap(),
            TrackLine::Failure(LocationErrorKind::Timeout)
        ));
        assert!(parse_track_line("error:gone").is_err());
        assert!(parse_track_line("51.2").is_err());
        assert!(parse_track_line("95,4").is_err());
    }

    #[test]
    fn test_non_finite_heading_is_rejected() {
        assert!(parse_track_line("51.2194,4.4025,nan").is_err());
        assert!(parse_track_line("51.2194,4.4025,inf").is_err());
        assert!(parse_heading("-infinity").is_err());
        assert_eq!(parse_heading(" 45 "), Ok(45.0));
    }

    #[test]
    fn test_pointer_to_applies_heading() {
        let from = Coordinate::new(51.2194, 4.4025);
        let to = Coordinate::new(51.2294, 4.4125);

        let bare = pointer_to(&from, &to, None);
        assert!(!bare.heading_applied);
        assert_eq!(bare.rotation_degrees, bare.bearing_degrees);

        let rotated = pointer_to(&from, &to, Some(90.0));
        assert!(rotated.heading_applied);
        let expected = (bare.bearing_degrees - 90.0).rem_euclid(360.0);
        assert!((rotated.rotation_degrees - expected).abs() < 1e-9);
    }
}
