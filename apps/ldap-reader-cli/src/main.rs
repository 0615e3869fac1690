//! ldap-reader - paged LDAP search from the command line
//!
//! Binds, runs one paged search, and prints every entry with the requested
//! attributes:
//!
//! ```text
//! ldap-reader --uri ldap://ldap.example.org \
//!     --bind-dn "cn=reader,ou=Accounts,dc=example,dc=org" \
//!     --base "ou=SSO,dc=example,dc=org" \
//!     --filter "(objectClass=user)" \
//!     -a sAMAccountName -a memberOf
//! ```

use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ldap_reader::{ConnectionSettings, DirectoryConnection, Ldap3Reader, LdapReader, ReaderConfig};

mod error;

use error::CliResult;

const SEPARATOR: &str = "---------------------------------------------------------";

/// Paged LDAP search
#[derive(Parser, Debug)]
#[command(name = "ldap-reader")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Server URI (e.g. ldap://ldap.example.org:389)
    #[arg(long, env = "LDAP_READER_URI")]
    uri: String,

    /// Full DN of the bind user
    #[arg(long, env = "LDAP_READER_BIND_DN")]
    bind_dn: String,

    /// Password of the bind user
    #[arg(long, env = "LDAP_READER_PASSWORD", hide_env_values = true)]
    password: String,

    /// Search base
    #[arg(long)]
    base: String,

    /// Search filter
    #[arg(long, default_value = "(objectClass=*)")]
    filter: String,

    /// Attribute to print (repeatable). All attributes are requested when omitted.
    #[arg(short = 'a', long = "attribute")]
    attributes: Vec<String>,

    /// Entries per page
    #[arg(long, default_value_t = 1000)]
    page_size: u32,

    /// Stop after this many entries
    #[arg(long)]
    limit: Option<usize>,

    /// Protocol version (0 keeps the library default)
    #[arg(long, default_value_t = 3)]
    protocol_version: u32,

    /// Upgrade the connection with STARTTLS
    #[arg(long)]
    starttls: bool,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn to_config(&self) -> ReaderConfig {
        let mut connection = ConnectionSettings::new().with_connection_timeout(self.timeout);
        if self.starttls {
            connection = connection.with_starttls();
        }

        ReaderConfig::new(&self.uri)
            .with_credentials(&self.bind_dn, &self.password)
            .with_protocol_version(self.protocol_version)
            .with_page_size(self.page_size)
            .with_connection(connection)
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "warn,ldap_reader=debug"
    } else {
        "warn,ldap_reader=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

fn run(cli: &Cli) -> CliResult<()> {
    let config = cli.to_config();
    let mut reader = Ldap3Reader::open(&config)?;

    if cli.attributes.is_empty() {
        reader.query(&cli.filter, &cli.base)?;
    } else {
        reader.query_attributes(&cli.filter, &cli.base, &cli.attributes)?;
    }

    let stdout = io::stdout();
    let printed = print_entries(&mut reader, &cli.attributes, cli.limit, &mut stdout.lock())?;

    tracing::info!(entries = printed, pages = reader.pages_fetched(), "Search finished");
    Ok(())
}

/// Print entries until the cursor is exhausted or `limit` is reached.
fn print_entries<C: DirectoryConnection>(
    reader: &mut LdapReader<C>,
    attributes: &[String],
    limit: Option<usize>,
    out: &mut impl Write,
) -> CliResult<usize> {
    let mut printed = 0;

    while limit.map_or(true, |max| printed < max) && reader.fetch()? {
        writeln!(out, "{SEPARATOR}")?;
        if let Some(dn) = reader.current_dn() {
            writeln!(out, "dn: {dn}")?;
        }

        for name in attributes {
            // Absent attributes print nothing.
            if let Some(values) = reader.get_attribute(name)? {
                for value in values.to_strings() {
                    writeln!(out, "{name}: {value}")?;
                }
                values.release();
            }
        }

        printed += 1;
    }

    if printed > 0 {
        writeln!(out, "{SEPARATOR}")?;
    }
    Ok(printed)
}
