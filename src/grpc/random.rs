use rand::Rng;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info};

use super::pb::random_numbers_server::RandomNumbers;
use super::pb::{
    GetRandomNumbersRequest, GetRandomNumbersResponse, SendRandomNumbersRequest,
    SendRandomNumbersResponse,
};

/// Most numbers a single `GetRandomNumbers` call may ask for.
pub const MAX_COUNT: i32 = 10_000;

const CHANNEL_SIZE: usize = 16;

#[derive(Debug, Default, Clone, Copy)]
pub struct RandomNumberService;

#[tonic::async_trait]
impl RandomNumbers for RandomNumberService {
    type GetRandomNumbersStream = ReceiverStream<Result<GetRandomNumbersResponse, Status>>;

    async fn get_random_numbers(
        &self,
        request: Request<GetRandomNumbersRequest>,
    ) -> Result<Response<Self::GetRandomNumbersStream>, Status> {
        let GetRandomNumbersRequest { min, max, count } = request.into_inner();
        if min > max {
            return Err(Status::invalid_argument(format!(
                "min {} is greater than max {}",
                min, max
            )));
        }
        if !(0..=MAX_COUNT).contains(&count) {
            return Err(Status::invalid_argument(format!(
                "count must be between 0 and {}, got {}",
                MAX_COUNT, count
            )));
        }
        debug!(min, max, count, "Streaming random numbers");

        let (tx, rx) = mpsc::channel(CHANNEL_SIZE);
        tokio::spawn(async move {
            for _ in 0..count {
                let number = rand::thread_rng().gen_range(min..=max);
                // the client hung up
                if tx.send(Ok(GetRandomNumbersResponse { number })).await.is_err() {
                    break;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn send_random_numbers(
        &self,
        request: Request<Streaming<SendRandomNumbersRequest>>,
    ) -> Result<Response<SendRandomNumbersResponse>, Status> {
        let mut stream = request.into_inner();
        let mut summary = SendRandomNumbersResponse::default();

        while let Some(message) = stream.next().await {
            let message = message?;
            summary.count = summary
                .count
                .checked_add(1)
                .ok_or_else(|| Status::out_of_range("too many numbers"))?;
            summary.sum = summary
                .sum
                .checked_add(message.number)
                .ok_or_else(|| Status::out_of_range("sum does not fit in int32"))?;
        }

        info!(count = summary.count, sum = summary.sum, "Received random numbers");
        Ok(Response::new(summary))
    }
}
