//! Block-wise observer of the DoDAG resource.
//!
//! An observer behaves like a remote client with a fixed block size: it
//! repeats GET exchanges, feeding back the returned offset, until the
//! resource reports the end of the body. The reassembled body is parsed as
//! JSON and kept as the observer's latest view.

use std::net::Ipv6Addr;

use dagview::{
    Address, BlockOffset, Clock, DagResource, Notify, Request, ResourceConfig, ResourceError,
    RoutingEngine, Timestamp, DAG_CHILD_LABEL, DAG_PARENT_LABEL,
};
use serde_json::Value;
use thiserror::Error;

/// Upper bound on exchanges for one retrieval.
pub const MAX_EXCHANGES: usize = 1024;

/// Parent and children as seen by an observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DagView {
    pub parent: Option<Address>,
    pub children: Vec<Address>,
}

impl DagView {
    /// Parse a reassembled body.
    pub fn parse(body: &[u8]) -> Result<Self, FetchError> {
        let value: Value = serde_json::from_slice(body)?;

        let parents = address_list(&value, DAG_PARENT_LABEL)?;
        if parents.len() > 1 {
            return Err(FetchError::Malformed("more than one parent"));
        }
        let children = address_list(&value, DAG_CHILD_LABEL)?;

        Ok(Self {
            parent: parents.first().copied(),
            children,
        })
    }
}

fn address_list(value: &Value, key: &'static str) -> Result<Vec<Address>, FetchError> {
    let list = value
        .get(key)
        .and_then(Value::as_array)
        .ok_or(FetchError::Malformed(key))?;

    list.iter()
        .map(|item| {
            item.as_str()
                .and_then(|s| s.parse::<Ipv6Addr>().ok())
                .map(Address::from)
                .ok_or(FetchError::Malformed(key))
        })
        .collect()
}

/// Why a retrieval failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("resource rejected exchange: {0}")]
    Resource(#[from] ResourceError),
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("body is missing or has a malformed `{0}` entry")]
    Malformed(&'static str),
    #[error("retrieval did not finish within {} exchanges", MAX_EXCHANGES)]
    TooManyExchanges,
}

/// Outcome of one complete retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieval {
    pub time: Timestamp,
    pub exchanges: usize,
    pub body_len: usize,
    pub view: DagView,
}

/// A client fetching the resource with a fixed block size.
#[derive(Debug, Clone)]
pub struct Observer {
    block_size: usize,
    history: Vec<Retrieval>,
    errors: u64,
}

impl Observer {
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            history: Vec::new(),
            errors: 0,
        }
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Successful retrievals in order.
    pub fn history(&self) -> &[Retrieval] {
        &self.history
    }

    pub fn latest(&self) -> Option<&Retrieval> {
        self.history.last()
    }

    pub fn errors(&self) -> u64 {
        self.errors
    }

    /// Retrieve the whole body, one block per exchange.
    pub fn fetch<Clk, N, C, R>(
        &mut self,
        resource: &DagResource<Clk, N, C>,
        routing: &R,
        now: Timestamp,
    ) -> Result<Retrieval, FetchError>
    where
        Clk: Clock,
        N: Notify,
        C: ResourceConfig,
        R: RoutingEngine,
    {
        match self.exchange_all(resource, routing) {
            Ok((exchanges, body)) => {
                let view = DagView::parse(&body).inspect_err(|_| self.errors += 1)?;
                let retrieval = Retrieval {
                    time: now,
                    exchanges,
                    body_len: body.len(),
                    view,
                };
                self.history.push(retrieval.clone());
                Ok(retrieval)
            }
            Err(e) => {
                self.errors += 1;
                Err(e)
            }
        }
    }

    fn exchange_all<Clk, N, C, R>(
        &self,
        resource: &DagResource<Clk, N, C>,
        routing: &R,
    ) -> Result<(usize, Vec<u8>), FetchError>
    where
        Clk: Clock,
        N: Notify,
        C: ResourceConfig,
        R: RoutingEngine,
    {
        let mut body = Vec::new();
        let mut buf = vec![0u8; self.block_size];
        let mut offset = BlockOffset::END;

        for exchange in 1..=MAX_EXCHANGES {
            let reply = resource.handle_get(routing, &Request::any(), &mut buf, &mut offset)?;
            body.extend_from_slice(&buf[..reply.payload_len]);
            if offset.is_end() {
                return Ok((exchange, body));
            }
        }
        Err(FetchError::TooManyExchanges)
    }
}
