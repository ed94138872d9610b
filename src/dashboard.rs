//! Dashboard snapshot

use ticketdesk_protocol::common::{Ticket, TicketStatistics};

use crate::client::{ApiClient, Transport};
use crate::error::Result;
use crate::tickets::TicketService;

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub statistics: TicketStatistics,
    pub my_tickets: Vec<Ticket>,
    pub assigned_tickets: Vec<Ticket>,
}

impl Dashboard {
    /// Fetch statistics and both ticket lists concurrently
    ///
    /// Fails with the first error; partial results are dropped.
    pub async fn load<T: Transport>(client: &ApiClient<T>) -> Result<Self> {
        let service = TicketService::new(client);

        let (statistics, my_tickets, assigned_tickets) = tokio::try_join!(
            service.statistics(),
            service.my_tickets(),
            service.assigned_to_me(),
        )?;

        Ok(Self {
            statistics,
            my_tickets,
            assigned_tickets,
        })
    }
}
