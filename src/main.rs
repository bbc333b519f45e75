#![deny(clippy::all)]
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::PathBuf;

use log::info;
use structopt::StructOpt;

use cifp_nav::altitude::Altitude;
use cifp_nav::cifp::procedure::Procedure;
use cifp_nav::geo::LatLon;
use cifp_nav::{Cifp, IngestPolicy};

#[derive(StructOpt)]
#[structopt(name = "cifp_nav")]
struct Args {
    /// FAACIFP18 text file, or the distribution zip holding it
    #[structopt(name = "input", parse(from_os_str))]
    input: PathBuf,
    #[structopt(short = "p", long = "procedure")]
    procedure: Option<String>,
    #[structopt(short = "a", long = "airport")]
    airport: Option<String>,
    #[structopt(short = "i", long = "inbound")]
    inbound: Option<String>,
    #[structopt(short = "o", long = "outbound")]
    outbound: Option<String>,
    #[structopt(short = "f", long = "fix")]
    fixes: Vec<String>,
    #[structopt(long = "airway")]
    airway: Option<String>,
    #[structopt(long = "lat", raw(allow_hyphen_values = "true"))]
    lat: Option<f64>,
    #[structopt(long = "lon", raw(allow_hyphen_values = "true"))]
    lon: Option<f64>,
    /// Feet MSL
    #[structopt(long = "alt", default_value = "0")]
    alt: i32,
    /// Stop at the first bad record instead of skipping it
    #[structopt(long = "strict")]
    strict: bool,
}

impl Args {
    fn position(&self) -> Option<LatLon> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some(LatLon::new(lat, lon)),
            _ => None,
        }
    }
}

fn find_procedure<'a>(cifp: &'a Cifp, args: &Args, name: &str) -> Result<&'a Procedure, Box<dyn Error>> {
    if let Some(airport) = &args.airport {
        return Ok(cifp.procedure(name, airport)?);
    }
    if let Some(position) = args.position() {
        return Ok(cifp.nearest_procedure(name, position)?);
    }
    match cifp.procedures(name) {
        [only] => Ok(only),
        [] => Err(format!("no procedure named {}", name).into()),
        many => Err(format!(
            "{} is published at {}; pick one with --airport",
            name,
            many.iter().map(|p| p.airport.as_str()).collect::<Vec<_>>().join(", ")
        )
        .into()),
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::from_args();
    let policy = if args.strict {
        IngestPolicy::Abort
    } else {
        IngestPolicy::SkipAndLog
    };

    info!("Loading {}...", args.input.display());
    let cifp = Cifp::from_path(&args.input, policy)?;

    for ident in &args.fixes {
        let fixes = cifp.fixes(ident);
        if fixes.is_empty() {
            println!("{}: not found", ident);
        }
        for fix in fixes {
            let variation = fix.variation.map_or_else(String::new, |v| format!(" var {:+.1}", v));
            println!(
                "{:5} {:2} {} {:?}{}",
                fix.ident, fix.region, fix.latlon, fix.source, variation
            );
        }
    }

    if let Some(name) = &args.procedure {
        let procedure = find_procedure(&cifp, &args, name)?;
        let route = procedure.select_route(args.inbound.as_deref(), args.outbound.as_deref())?;
        println!("{} {} ({:?})", procedure.airport, procedure.name, procedure.kind);
        for (i, leg) in route.iter().enumerate() {
            println!("{:3} {}", i + 1, leg);
        }
    } else if let Some(airport) = &args.airport {
        let mut names: Vec<String> = cifp
            .procedures_at(airport)
            .map(|p| format!("{} ({:?})", p.name, p.kind))
            .collect();
        names.sort();
        for name in names {
            println!("{}", name);
        }
    }

    if let Some(name) = &args.airway {
        for airway in cifp.airways(name) {
            let fixes: Vec<String> = airway
                .fixes()
                .iter()
                .map(|f| match f.min_altitude {
                    Some(min) => format!("{} ({})", f.fix.name, min),
                    None => f.fix.name.clone(),
                })
                .collect();
            println!("{}: {}", airway.name, fixes.join(" "));
        }
    }

    if let (Some(position), None) = (args.position(), &args.procedure) {
        let altitude = Altitude::msl(args.alt);
        for airspace in cifp.airspaces_containing(position, altitude) {
            println!("{} {} {:?}", airspace.designator, airspace.name, airspace.kind);
        }
        for msa in cifp.msa(args.airport.as_deref().unwrap_or("")) {
            if let Some(minimum) = msa.altitude(position) {
                println!("MSA {} {}", msa.center.name, minimum);
            }
        }
    }

    Ok(())
}
