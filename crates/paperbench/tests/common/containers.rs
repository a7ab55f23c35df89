//! Throwaway database servers for the backend tests.
//!
//! Each helper starts a container and connects the real adapter to it. The
//! container must outlive the backend, so both are returned.

use anyhow::Result;
use paperbench::{MongoBackend, PostgresBackend, RedisBackend};
use testcontainers::Container;
use testcontainers_modules::mongo::Mongo;
use testcontainers_modules::postgres::Postgres;
use testcontainers_modules::redis::Redis;
use testcontainers_modules::testcontainers::runners::SyncRunner;

pub fn postgres() -> Result<(Container<Postgres>, PostgresBackend)> {
    let container = Postgres::default()
        .with_db_name("arxiv_db")
        .with_user("postgres")
        .with_password("postgres")
        .start()?;

    let host = container.get_host()?;
    let port = container.get_host_port_ipv4(5432)?;
    let url = format!("postgres://postgres:postgres@{host}:{port}/arxiv_db");

    let backend = PostgresBackend::connect(&url)?;
    Ok((container, backend))
}

pub fn mongo() -> Result<(Container<Mongo>, MongoBackend)> {
    let container = Mongo::default().start()?;

    let host = container.get_host()?;
    let port = container.get_host_port_ipv4(27017)?;

    let backend = MongoBackend::connect(&format!("mongodb://{host}:{port}"), "arxiv_db")?;
    Ok((container, backend))
}

pub fn redis() -> Result<(Container<Redis>, RedisBackend)> {
    let container = Redis::default().start()?;

    let host = container.get_host()?;
    let port = container.get_host_port_ipv4(6379)?;

    let backend = RedisBackend::connect(&format!("redis://{host}:{port}/"))?;
    Ok((container, backend))
}
