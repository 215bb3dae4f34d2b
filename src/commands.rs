//! Command dispatcher: a static table from uppercased command name to
//! handler, each handler responsible for its own arity check and reply
//! encoding (spec.md §4.4).
//!
//! Grounded on the teacher's `CMD_TABLE: Lazy<HashMap<&str, Arc<RedisCommand>>>`
//! plus `lookup_command`/`call` in `src/redis/cmd.rs`; individual handler
//! shapes (a thin generic wrapper plus a handful of command-specific
//! entry points, e.g. `set_generic_command`/`incr_decr_command`) are
//! adapted from that file onto the three keyspaces this crate actually
//! has.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::resp::Reply;
use crate::store::{Store, StoreError};

type Handler = fn(&[Vec<u8>], &Store) -> Reply;

static DISPATCH_TABLE: Lazy<HashMap<&'static str, Handler>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Handler> = HashMap::new();
    m.insert("PING", ping);
    m.insert("ECHO", echo);
    m.insert("FLUSHALL", flushall);
    m.insert("SET", set);
    m.insert("GET", get);
    m.insert("GETSET", getset);
    m.insert("KEYS", keys);
    m.insert("TYPE", type_cmd);
    m.insert("DEL", del);
    m.insert("UNLINK", del);
    m.insert("EXPIRE", expire);
    m.insert("RENAME", rename);
    m.insert("LLEN", llen);
    m.insert("LGET", lget);
    m.insert("LINDEX", lindex);
    m.insert("LSET", lset);
    m.insert("LREM", lrem);
    m.insert("LPUSH", lpush);
    m.insert("RPUSH", rpush);
    m.insert("LPOP", lpop);
    m.insert("RPOP", rpop);
    m.insert("HSET", hset);
    m.insert("HGET", hget);
    m.insert("HEXISTS", hexists);
    m.insert("HDEL", hdel);
    m.insert("HLEN", hlen);
    m.insert("HKEYS", hkeys);
    m.insert("HVALS", hvals);
    m.insert("HGETALL", hgetall);
    m.insert("HMSET", hmset);
    m.insert("HSETNX", hsetnx);
    m.insert("HRANDFIELD", hrandfield);
    m
});

/// Dispatches one framed request. An empty token list (the framer
/// produced no tokens, e.g. a blank inline line) yields `Reply::None`:
/// the server sends nothing and waits for more input, per spec.md §4.4.
pub fn dispatch(tokens: &[Vec<u8>], store: &Store) -> Reply {
    let Some(name) = tokens.first() else {
        return Reply::None;
    };
    let original = String::from_utf8_lossy(name).to_string();
    let upper = original.to_ascii_uppercase();
    match DISPATCH_TABLE.get(upper.as_str()) {
        Some(handler) => handler(&tokens[1..], store),
        None => Reply::Error(format!("ERR unknown command '{original}'")),
    }
}

fn arity_err(cmd: &str) -> Reply {
    Reply::Error(format!("ERR wrong number of arguments for '{cmd}' command"))
}

fn bulk(v: Option<Vec<u8>>) -> Reply {
    match v {
        Some(v) => Reply::Bulk(v),
        None => Reply::Nil,
    }
}

fn bool_to_int(b: bool) -> Reply {
    Reply::Integer(if b { 1 } else { 0 })
}

fn parse_i64(arg: &[u8]) -> Result<i64, Reply> {
    std::str::from_utf8(arg)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Reply::Error("Error: invalid index".to_string()))
}

// ---- connection-level ----

fn ping(args: &[Vec<u8>], _store: &Store) -> Reply {
    match args.first() {
        None => Reply::Simple("PONG".to_string()),
        Some(msg) => Reply::Simple(String::from_utf8_lossy(msg).to_string()),
    }
}

fn echo(args: &[Vec<u8>], _store: &Store) -> Reply {
    match args.first() {
        Some(msg) => Reply::Bulk(msg.clone()),
        None => arity_err("ECHO"),
    }
}

fn flushall(_args: &[Vec<u8>], store: &Store) -> Reply {
    store.flushall();
    Reply::ok()
}

// ---- strings ----

fn set(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("SET");
    }
    store.set(args[0].clone(), args[1].clone());
    Reply::ok()
}

fn get(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("GET");
    }
    bulk(store.get(&args[0]))
}

fn getset(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("GETSET");
    }
    bulk(store.getset(args[0].clone(), args[1].clone()))
}

// ---- generic ----

fn keys(args: &[Vec<u8>], store: &Store) -> Reply {
    if !args.is_empty() {
        return arity_err("KEYS");
    }
    Reply::Array(store.keys().into_iter().map(Reply::Bulk).collect())
}

fn type_cmd(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("TYPE");
    }
    Reply::Simple(store.key_type(&args[0]).to_string())
}

fn del(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("DEL");
    }
    bool_to_int(store.del(&args[0]))
}

fn expire(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("EXPIRE");
    }
    let secs = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(r) => return r,
    };
    if store.expire(&args[0], secs) {
        Reply::ok()
    } else {
        Reply::Error("Error: Key not found".to_string())
    }
}

fn rename(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("RENAME");
    }
    if store.rename(&args[0], args[1].clone()) {
        Reply::ok()
    } else {
        Reply::Error("Error: Key not found".to_string())
    }
}

// ---- lists ----

fn lpush(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() < 2 {
        return arity_err("LPUSH");
    }
    match store.lpush(args[0].clone(), args[1..].to_vec()) {
        Ok(len) => Reply::Integer(len),
        Err(StoreError::WrongType) => wrong_type(),
        Err(_) => unreachable!("lpush only returns WrongType"),
    }
}

fn rpush(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() < 2 {
        return arity_err("RPUSH");
    }
    match store.rpush(args[0].clone(), args[1..].to_vec()) {
        Ok(len) => Reply::Integer(len),
        Err(StoreError::WrongType) => wrong_type(),
        Err(_) => unreachable!("rpush only returns WrongType"),
    }
}

fn lpop(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("LPOP");
    }
    bulk(store.lpop(&args[0]))
}

fn rpop(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("RPOP");
    }
    bulk(store.rpop(&args[0]))
}

fn llen(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("LLEN");
    }
    Reply::Integer(store.llen(&args[0]))
}

fn lindex(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("LINDEX");
    }
    let idx = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(r) => return r,
    };
    bulk(store.lindex(&args[0], idx))
}

fn lset(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 3 {
        return arity_err("LSET");
    }
    let idx = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(r) => return r,
    };
    match store.lset(&args[0], idx, args[2].clone()) {
        Ok(()) => Reply::ok(),
        Err(_) => Reply::Error("Error: Index out of range".to_string()),
    }
}

fn lrem(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 3 {
        return arity_err("LREM");
    }
    let count = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(r) => return r,
    };
    Reply::Integer(store.lrem(&args[0], count, &args[2]))
}

fn lget(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("LGET");
    }
    Reply::Array(store.lget(&args[0]).into_iter().map(Reply::Bulk).collect())
}

// ---- hashes ----

fn hset(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 3 {
        return arity_err("HSET");
    }
    match store.hset(args[0].clone(), args[1].clone(), args[2].clone()) {
        Ok(()) => Reply::Integer(1),
        Err(StoreError::WrongType) => wrong_type(),
        Err(_) => unreachable!("hset only returns WrongType"),
    }
}

fn hget(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("HGET");
    }
    bulk(store.hget(&args[0], &args[1]))
}

fn hexists(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("HEXISTS");
    }
    bool_to_int(store.hexists(&args[0], &args[1]))
}

fn hdel(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("HDEL");
    }
    bool_to_int(store.hdel(&args[0], &args[1]))
}

fn hlen(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("HLEN");
    }
    Reply::Integer(store.hlen(&args[0]))
}

fn hkeys(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("HKEYS");
    }
    Reply::Array(store.hkeys(&args[0]).into_iter().map(Reply::Bulk).collect())
}

fn hvals(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("HVALS");
    }
    Reply::Array(store.hvals(&args[0]).into_iter().map(Reply::Bulk).collect())
}

fn hgetall(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 1 {
        return arity_err("HGETALL");
    }
    let mut items = Vec::new();
    for (field, value) in store.hgetall(&args[0]) {
        items.push(Reply::Bulk(field));
        items.push(Reply::Bulk(value));
    }
    Reply::Array(items)
}

fn hmset(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() < 3 || args.len() % 2 == 0 {
        return Reply::Error("Error: HMSET requires key followed by field value pairs".to_string());
    }
    let key = args[0].clone();
    let pairs = args[1..]
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
        .collect();
    match store.hmset(key, pairs) {
        Ok(()) => Reply::Integer(1),
        Err(StoreError::WrongType) => wrong_type(),
        Err(_) => unreachable!("hmset only returns WrongType"),
    }
}

fn hsetnx(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 3 {
        return arity_err("HSETNX");
    }
    bool_to_int(store.hsetnx(&args[0], args[1].clone(), args[2].clone()))
}

fn hrandfield(args: &[Vec<u8>], store: &Store) -> Reply {
    if args.len() != 2 {
        return arity_err("HRANDFIELD");
    }
    let n = match parse_i64(&args[1]) {
        Ok(n) => n,
        Err(r) => return r,
    };
    Reply::Array(store.hrandfield(&args[0], n).into_iter().map(Reply::Bulk).collect())
}

fn wrong_type() -> Reply {
    Reply::Error("Error: Operation against a key holding the wrong kind of value".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Vec<Vec<u8>> {
        s.split_whitespace().map(|w| w.as_bytes().to_vec()).collect()
    }

    #[test]
    fn ping_no_arg() {
        let store = Store::new();
        assert_eq!(dispatch(&t("PING"), &store), Reply::Simple("PONG".to_string()));
    }

    #[test]
    fn ping_with_message() {
        let store = Store::new();
        assert_eq!(dispatch(&t("PING hello"), &store), Reply::Simple("hello".to_string()));
    }

    #[test]
    fn unknown_command() {
        let store = Store::new();
        assert_eq!(
            dispatch(&t("NOPE"), &store),
            Reply::Error("ERR unknown command 'NOPE'".to_string())
        );
    }

    #[test]
    fn unknown_command_echoes_original_case() {
        let store = Store::new();
        assert_eq!(
            dispatch(&t("foobar"), &store),
            Reply::Error("ERR unknown command 'foobar'".to_string())
        );
    }

    #[test]
    fn empty_frame_yields_no_reply() {
        let store = Store::new();
        assert_eq!(dispatch(&[], &store), Reply::None);
    }

    #[test]
    fn set_then_get_scenario() {
        let store = Store::new();
        assert_eq!(dispatch(&t("SET foo bar"), &store), Reply::ok());
        assert_eq!(dispatch(&t("GET foo"), &store), Reply::Bulk(b"bar".to_vec()));
    }

    #[test]
    fn command_name_is_case_insensitive() {
        let store = Store::new();
        assert_eq!(dispatch(&t("set foo bar"), &store), Reply::ok());
        assert_eq!(dispatch(&t("get foo"), &store), Reply::Bulk(b"bar".to_vec()));
    }

    #[test]
    fn rpush_lindex_lrem_llen_scenario() {
        let store = Store::new();
        assert_eq!(dispatch(&t("RPUSH L a b c"), &store), Reply::Integer(3));
        assert_eq!(dispatch(&t("LINDEX L -1"), &store), Reply::Bulk(b"c".to_vec()));
        assert_eq!(dispatch(&t("LREM L 0 a"), &store), Reply::Integer(1));
        assert_eq!(dispatch(&t("LLEN L"), &store), Reply::Integer(2));
    }

    #[test]
    fn hset_hgetall_scenario() {
        let store = Store::new();
        assert_eq!(dispatch(&t("HSET H f1 v1"), &store), Reply::Integer(1));
        assert_eq!(dispatch(&t("HSET H f2 v2"), &store), Reply::Integer(1));
        let reply = dispatch(&t("HGETALL H"), &store);
        match reply {
            Reply::Array(items) => assert_eq!(items.len(), 4),
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn rename_missing_key_errors() {
        let store = Store::new();
        assert_eq!(
            dispatch(&t("RENAME a b"), &store),
            Reply::Error("Error: Key not found".to_string())
        );
    }

    #[test]
    fn hmset_requires_odd_total_arity() {
        let store = Store::new();
        assert_eq!(
            dispatch(&t("HMSET H f1"), &store),
            Reply::Error("Error: HMSET requires key followed by field value pairs".to_string())
        );
    }

    #[test]
    fn wrong_arity_is_an_error() {
        let store = Store::new();
        assert_eq!(
            dispatch(&t("GET"), &store),
            Reply::Error("ERR wrong number of arguments for 'GET' command".to_string())
        );
    }
}
