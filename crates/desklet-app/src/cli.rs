use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use desklet_layout::{ContainerHandle, SurfaceSpec};

/// Desklet: desktop widgets with optional backend processes.
#[derive(Parser, Debug)]
#[command(name = "desklet", version, about)]
pub struct Args {
    /// Config file path override.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error or a filter directive).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Surface size as WxH, one per monitor. Defaults to one 1920x1080 surface.
    #[arg(long = "surface", value_name = "WxH", global = true)]
    pub surfaces: Vec<SurfaceSize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the widget daemon until Ctrl-C (the default).
    Run,
    /// List installed widgets.
    ListWidgets,
    /// List placed widget instances.
    List,
    /// Place a new instance of a widget.
    Add {
        widget_id: String,
        /// Monitor to place it on; the first surface when omitted.
        #[arg(long)]
        monitor: Option<u32>,
        #[arg(long, requires = "y")]
        x: Option<f64>,
        #[arg(long, requires = "x")]
        y: Option<f64>,
    },
    /// Remove a placed instance.
    Remove { instance_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

impl FromStr for SurfaceSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WxH, got {s:?}"))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n > 0.0)
                .ok_or_else(|| format!("invalid dimension {v:?} in {s:?}"))
        };
        Ok(Self {
            width: parse(w)?,
            height: parse(h)?,
        })
    }
}

impl Args {
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Run)
    }

    /// One surface per `--surface`, monitor indices in argument order.
    pub fn surface_specs(&self) -> Vec<SurfaceSpec> {
        let sizes = if self.surfaces.is_empty() {
            vec![SurfaceSize {
                width: 1920.0,
                height: 1080.0,
            }]
        } else {
            self.surfaces.clone()
        };
        sizes
            .iter()
            .enumerate()
            .map(|(i, size)| SurfaceSpec {
                monitor_index: i as u32,
                container: ContainerHandle(i as u64),
                normalized_width: size.width,
                normalized_height: size.height,
            })
            .collect()
    }
}

pub fn parse() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_run() {
        let args = Args::try_parse_from(["desklet"]).unwrap();
        assert_eq!(args.command(), Command::Run);
        let specs = args.surface_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].normalized_width, 1920.0);
        assert_eq!(specs[0].normalized_height, 1080.0);
    }

    #[test]
    fn repeated_surfaces_become_monitors() {
        let args = Args::try_parse_from([
            "desklet",
            "--surface",
            "2560x1440",
            "--surface",
            "1280X1024",
            "list",
        ])
        .unwrap();
        let specs = args.surface_specs();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].monitor_index, 1);
        assert_eq!(specs[1].normalized_height, 1024.0);
        assert_eq!(args.command(), Command::List);
    }

    #[test]
    fn bad_surface_is_rejected() {
        assert!(Args::try_parse_from(["desklet", "--surface", "wide"]).is_err());
        assert!(Args::try_parse_from(["desklet", "--surface", "0x100"]).is_err());
    }

    #[test]
    fn add_takes_position_pairs() {
        let args =
            Args::try_parse_from(["desklet", "add", "clock", "--monitor", "1", "--x", "10", "--y", "20"])
                .unwrap();
        assert_eq!(
            args.command(),
            Command::Add {
                widget_id: "clock".into(),
                monitor: Some(1),
                x: Some(10.0),
                y: Some(20.0),
            }
        );
        assert!(Args::try_parse_from(["desklet", "add", "clock", "--x", "10"]).is_err());
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            Args::try_parse_from(["desklet", "remove", "abc", "--log-level", "debug"]).unwrap();
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert_eq!(
            args.command(),
            Command::Remove {
                instance_id: "abc".into()
            }
        );
    }
}
