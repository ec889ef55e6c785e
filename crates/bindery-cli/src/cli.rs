use bindery_bookstore::DEFAULT_CONFIG_PATH;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "bindery",
    about = "Bindery: schema-first records bound from forms, rendered as JSON, stored as BSON",
    version
)]
pub struct Cli {
    /// Config file (TOML); a missing default file means built-in defaults
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Data directory, overriding the config file
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the bookstore over HTTP
    Serve {
        /// Bind address (host:port), overriding the config file
        #[arg(long)]
        bind: Option<String>,

        /// Stop after this many requests
        #[arg(long)]
        max_requests: Option<usize>,
    },

    /// Write the sample catalogue into the data directory
    Seed {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run one request against the data directory and print the response
    Request {
        /// Request target, e.g. `/book?book_id=dune`
        target: String,

        /// Cookie sent with the request (repeatable)
        #[arg(long = "cookie", value_name = "NAME=VALUE")]
        cookies: Vec<String>,

        /// Urlencoded request body
        #[arg(long)]
        body: Option<String>,

        /// Output status, cookies, and body as one JSON object
        #[arg(long)]
        json: bool,
    },

    /// Print a stored record as JSON
    Show {
        /// Record name or collection name
        record: String,

        /// Document id
        id: String,
    },

    /// Print a record type's field outline
    Schema {
        /// Record name or collection name
        record: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bind form parameters into a record and print it as JSON
    Bind {
        /// Record name or collection name
        record: String,

        /// Form parameter (repeatable); nested keys use `a.b` or `a[b]`
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// Urlencoded query string, read after any --param values
        #[arg(long)]
        query: Option<String>,
    },

    /// List the record types and the collections that store them
    Records {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
