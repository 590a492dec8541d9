//! Loopback RESP server answering from a memory store

use super::{Frame, FrameCodec};
use crate::error::StoreError;
use crate::store::{MemoryStore, StoreClient};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

/// Serve `store` on an ephemeral port, returns its `host:port`
pub async fn spawn(store: MemoryStore) -> String {
    let listener = bind().await;
    let address = local_address(&listener);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, store.clone()));
        }
    });

    address
}

/// Like [`spawn`], except that the first connection is accepted and never answered
pub async fn spawn_with_silent_first(store: MemoryStore) -> String {
    let listener = bind().await;
    let address = local_address(&listener);

    tokio::spawn(async move {
        let silent = listener.accept().await;
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, store.clone()));
        }
        drop(silent);
    });

    address
}

/// Address nothing listens on
pub async fn closed_address() -> String {
    let listener = bind().await;
    local_address(&listener)
}

async fn bind() -> TcpListener {
    TcpListener::bind("127.0.0.1:0").await.unwrap()
}

fn local_address(listener: &TcpListener) -> String {
    listener.local_addr().unwrap().to_string()
}

async fn serve(socket: TcpStream, store: MemoryStore) {
    let mut framed = Framed::new(socket, FrameCodec::new());
    while let Some(Ok(frame)) = framed.next().await {
        let reply = answer(&store, frame).await;
        if framed.send(reply).await.is_err() {
            return;
        }
    }
}

/// Answer one command frame the way a RESP server would
pub async fn answer(store: &MemoryStore, frame: Frame) -> Frame {
    let words = match frame.into_words() {
        Some(words) if !words.is_empty() => words,
        _ => return Frame::Error("ERR expected a command".to_string()),
    };
    let name = words[0].to_uppercase();
    let args = &words[1..];
    let key = args.first().map(String::as_str).unwrap_or_default();
    let number = |i: usize| args.get(i).and_then(|a| a.parse::<i64>().ok()).unwrap_or(0);
    let strings = |items: Vec<String>| Frame::Array(items.into_iter().map(Frame::bulk).collect());
    let optional = |value: Option<String>| value.map(Frame::bulk).unwrap_or(Frame::Null);

    let result = match name.as_str() {
        // Connection setup sent by client libraries
        "CLIENT" | "SELECT" => Ok(Frame::ok()),
        "PING" => Ok(Frame::Simple("PONG".to_string())),
        _ if args.is_empty() => {
            return Frame::Error(format!("ERR wrong number of arguments for '{}'", name));
        }
        "SET" if args.len() == 3 && args[2].eq_ignore_ascii_case("NX") => store
            .set_if_absent(key, &args[1])
            .await
            .map(|won| if won { Frame::ok() } else { Frame::Null }),
        "SET" if args.len() == 2 => store.set(key, &args[1]).await.map(|_| Frame::ok()),
        "GET" => store.get(key).await.map(optional),
        "DEL" => store.delete(key).await.map(Frame::flag),
        "EXISTS" => store.exists(key).await.map(Frame::flag),
        "EXPIRE" => store.expire(key, number(1)).await.map(Frame::flag),
        "TTL" => store.ttl(key).await.map(Frame::Integer),
        "SADD" => store.set_add(key, &args[1..]).await.map(|n| Frame::Integer(n as i64)),
        "SMEMBERS" => store
            .set_members(key)
            .await
            .map(|members| strings(members.into_iter().collect())),
        "RPUSH" => store.list_push(key, &args[1..]).await.map(|n| Frame::Integer(n as i64)),
        "LRANGE" => store.list_range(key, number(1), number(2)).await.map(strings),
        "LLEN" => store.list_len(key).await.map(|n| Frame::Integer(n as i64)),
        "RPOP" => store.list_pop_tail(key).await.map(optional),
        other => Ok(Frame::Error(format!("ERR unknown command '{}'", other))),
    };

    result.unwrap_or_else(|e| match e {
        StoreError::Server(message) => Frame::Error(message),
        other => Frame::Error(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(words: &[&str]) -> Frame {
        Frame::Array(words.iter().map(|w| Frame::bulk(*w)).collect())
    }

    #[tokio::test]
    async fn test_answers() {
        let store = MemoryStore::new();

        assert_eq!(answer(&store, command(&["set", "k", "v"])).await, Frame::ok());
        assert_eq!(answer(&store, command(&["SET", "k", "w", "NX"])).await, Frame::Null);
        assert_eq!(answer(&store, command(&["GET", "k"])).await, Frame::bulk("v"));
        assert_eq!(answer(&store, command(&["RPUSH", "l", "a", "b"])).await, Frame::Integer(2));
        assert_eq!(
            answer(&store, command(&["LRANGE", "l", "0", "-1"])).await,
            Frame::Array(vec![Frame::bulk("a"), Frame::bulk("b")])
        );
        assert_eq!(answer(&store, command(&["CLIENT", "SETINFO", "LIB-NAME", "x"])).await, Frame::ok());
    }

    #[tokio::test]
    async fn test_error_replies() {
        let store = MemoryStore::new();
        answer(&store, command(&["SET", "k", "v"])).await;

        let wrong = answer(&store, command(&["LLEN", "k"])).await;
        assert!(matches!(wrong, Frame::Error(ref m) if m.starts_with("WRONGTYPE")));

        let huge = answer(&store, command(&["EXPIRE", "k", &i64::MAX.to_string()])).await;
        assert_eq!(huge, Frame::Error("ERR invalid expire time in 'expire' command".into()));

        assert!(matches!(answer(&store, command(&["GET"])).await, Frame::Error(_)));
        assert!(matches!(answer(&store, Frame::Integer(1)).await, Frame::Error(_)));
    }
}
