use super::{Transport, TransportError};
use crate::processor::Processor;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

/// A transport that delivers frames to a [`Processor`] running in the same process.
///
/// It behaves like a network transport as far as the lifecycle goes (it has to be opened and
/// fails with [`TransportError::NotOpen`] once closed), which makes it a drop-in replacement
/// for [`HttpTransport`](super::HttpTransport) in tests.
#[derive(Debug)]
pub struct ProcessorTransport<P> {
    processor: Arc<P>,
    open: bool,
}

impl<P> ProcessorTransport<P> {
    pub fn new(processor: P) -> Self {
        Self::from_arc(Arc::new(processor))
    }

    pub fn from_arc(processor: Arc<P>) -> Self {
        Self {
            processor,
            open: false,
        }
    }
}

impl<P> Clone for ProcessorTransport<P> {
    fn clone(&self) -> Self {
        Self {
            processor: Arc::clone(&self.processor),
            open: self.open,
        }
    }
}

#[async_trait]
impl<P: Processor> Transport for ProcessorTransport<P> {
    async fn open(&mut self) -> Result<(), TransportError> {
        self.open = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn exchange(&mut self, request: Bytes) -> Result<Bytes, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let response = self.processor.process(request).await?;
        Ok(response.unwrap_or_default())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.open = false;
        Ok(())
    }
}
