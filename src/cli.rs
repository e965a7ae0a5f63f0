use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::io::Input;

/// Serializer flag bits understood by the game; higher bits are dropped.
pub const SERIALIZER_FLAGS_MASK: u32 = 0x1F;

#[derive(Parser, Debug)]
#[command(name = "printrospector")]
#[command(version)]
#[command(about = "Extracts KIWAD archives and inspects KingsIsle binary data", long_about = None)]
#[command(after_help = "Examples:\n  \
  printrospector -k wad -i Root.wad -o Root        extract every file of Root.wad\n  \
  printrospector -k wad -i Root.wad -l             list the entry table\n  \
  printrospector -k wad -i Root.wad -o out '*.xml' extract only XML files")]
pub struct Cli {
    /// Hexadecimal input data, e.g. "4b 49 57 41 44"
    #[arg(long, value_name = "HEX", required_unless_present = "infile", overrides_with = "infile")]
    pub hex: Option<String>,

    /// Path to the input file
    #[arg(short = 'i', long, value_name = "FILE", overrides_with = "hex")]
    pub infile: Option<PathBuf>,

    /// Output path (the extraction directory for archives)
    #[arg(short = 'o', long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Kind of data to process
    #[arg(short = 'k', long, value_enum, default_value_t = DataKind::Op)]
    pub data_kind: DataKind,

    /// Serialize or deserialize the input
    #[arg(short = 'd', long, value_enum, default_value_t = SerializeOpt::De)]
    pub serialize_opt: SerializeOpt,

    /// ObjectProperty serializer to use
    #[arg(short = 's', long, value_enum, default_value_t = SerializerType::Basic)]
    pub serializer_type: SerializerType,

    /// Serializer flag bits, decimal or 0x-prefixed hex (masked to 5 bits)
    #[arg(short = 'f', long, value_parser = parse_serializer_flags, default_value = "0")]
    pub serializer_flags: u32,

    /// Property flag mask, decimal or 0x-prefixed hex
    #[arg(short = 'm', long, value_parser = parse_int, default_value = "0x18")]
    pub property_mask: u32,

    /// Shallow instead of deep ObjectProperty (de)serialization
    #[arg(long)]
    pub shallow: bool,

    /// Data is compressed manually rather than by serializer flags
    #[arg(short = 'c', long)]
    pub manual_compression: bool,

    /// List archive entries instead of extracting them
    #[arg(short = 'l', long)]
    pub list: bool,

    /// Check the CRC32 of every extracted entry
    #[arg(long)]
    pub verify_checksums: bool,

    /// Entries between two progress updates
    #[arg(long, value_name = "N", default_value_t = 64)]
    pub progress_interval: usize,

    /// Only print warnings and errors
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Archive entries to extract (default: all)
    #[arg(value_name = "FILES")]
    pub files: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DataKind {
    /// ObjectProperty binary state
    Op,
    /// KIWAD archive
    Wad,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializeOpt {
    Ser,
    De,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SerializerType {
    Basic,
    Core,
    Mannequin,
}

impl Cli {
    /// The selected input source.
    ///
    /// `--hex` and `--infile` override each other, so only the one given
    /// last survives parsing.
    pub fn input(&self) -> Input {
        match (&self.hex, &self.infile) {
            (Some(hex), _) => Input::Hex(hex.clone()),
            (None, Some(path)) => Input::File(path.clone()),
            (None, None) => unreachable!("clap requires --hex or --infile"),
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}

/// Parses a `u32` in decimal or with a `0x` prefix.
fn parse_int(value: &str) -> Result<u32, String> {
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|e| format!("invalid integer {value:?}: {e}"))
}

fn parse_serializer_flags(value: &str) -> Result<u32, String> {
    parse_int(value).map(|flags| flags & SERIALIZER_FLAGS_MASK)
}
